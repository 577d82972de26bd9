//! Browse abstraction over a network-service namespace

use async_trait::async_trait;
use std::net::IpAddr;

use crate::service::DiscoveryError;

/// One resolved service advertisement
#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    /// Instance name, without the service-type suffix (e.g. `fluidnc`)
    pub name: String,
    /// Advertised host name (e.g. `fluidnc.local.`)
    pub hostname: String,
    pub addresses: Vec<IpAddr>,
    pub port: u16,
}

impl Advertisement {
    /// Preferred address: the lowest IPv4, else the lowest IPv6
    pub fn preferred_address(&self) -> Option<IpAddr> {
        let v4 = self.addresses.iter().filter(|a| a.is_ipv4()).min();
        v4.or_else(|| self.addresses.iter().min()).copied()
    }
}

/// Opens browse sessions for a service type
#[async_trait]
pub trait Browse: Send + Sync {
    async fn open(&self, service_type: &str) -> Result<Box<dyn BrowseSession>, DiscoveryError>;
}

/// A live browse. Dropping it ends the browse and releases its resources.
#[async_trait]
pub trait BrowseSession: Send {
    /// Next resolved advertisement, or `None` once the browse has ended
    async fn next(&mut self) -> Option<Advertisement>;
}
