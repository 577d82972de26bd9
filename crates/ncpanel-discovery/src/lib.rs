//! ncpanel Discovery - Finding the controller on the local network
//!
//! The controller advertises itself over mDNS under a fixed service type.
//! Discovery browses that service type for a fixed window, collects every
//! advertisement, and returns the address of the one whose instance name
//! matches the configured hostname exactly.

pub mod browser;
pub mod mdns;
pub mod service;

pub use browser::{Advertisement, Browse, BrowseSession};
pub use mdns::MdnsBrowser;
pub use service::{Discovery, DiscoveryError, DiscoveryOptions, FLUIDNC_SERVICE_TYPE};
