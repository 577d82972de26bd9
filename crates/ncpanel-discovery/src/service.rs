//! Discovery service: exact-name lookup over a fixed browse window

use ncpanel_core::shutdown::{is_stopped, stopped, StopReceiver};
use ncpanel_core::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::Browse;

/// Service type FluidNC controllers advertise
pub const FLUIDNC_SERVICE_TYPE: &str = "_fluidnc._tcp.local.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("No controller named {name:?} advertised (saw {candidates:?})")]
    NotFound {
        name: String,
        candidates: Vec<String>,
    },
    #[error("Browse failed: {0}")]
    Browse(String),
    #[error("Discovery cancelled")]
    Cancelled,
}

/// Discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// Service type to browse
    pub service_type: String,
    /// How long to collect advertisements before deciding
    pub timeout_secs: u64,
    /// Session port combined with the discovered IP
    pub session_port: u16,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            service_type: FLUIDNC_SERVICE_TYPE.to_string(),
            timeout_secs: 5,
            session_port: 81,
        }
    }
}

/// Discovery service over any [`Browse`] implementation
pub struct Discovery {
    browser: Arc<dyn Browse>,
    options: DiscoveryOptions,
}

impl Discovery {
    pub fn new(browser: Arc<dyn Browse>, options: DiscoveryOptions) -> Self {
        Self { browser, options }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Browse for the full window and return the address advertised under
    /// exactly `preferred_name`.
    ///
    /// Other advertisements are collected for logging only and are never
    /// returned, no matter how early they arrive. A stop request ends the
    /// wait with [`DiscoveryError::Cancelled`].
    pub async fn discover(
        &self,
        preferred_name: &str,
        stop: &mut StopReceiver,
    ) -> Result<Address, DiscoveryError> {
        if is_stopped(stop) {
            return Err(DiscoveryError::Cancelled);
        }

        let window = Duration::from_secs(self.options.timeout_secs);
        info!(
            name = %preferred_name,
            service_type = %self.options.service_type,
            window_secs = self.options.timeout_secs,
            "Browsing for controller"
        );

        let mut session = self.browser.open(&self.options.service_type).await?;
        let mut candidates: BTreeMap<String, IpAddr> = BTreeMap::new();

        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = stopped(stop) => {
                    debug!("Discovery cancelled by stop request");
                    return Err(DiscoveryError::Cancelled);
                }
                ad = session.next() => match ad {
                    Some(ad) => match ad.preferred_address() {
                        Some(ip) => {
                            debug!(name = %ad.name, ip = %ip, "Controller advertisement");
                            candidates.insert(ad.name, ip);
                        }
                        None => debug!(name = %ad.name, "Advertisement without address"),
                    },
                    None => {
                        debug!("Browse ended before the window closed");
                        break;
                    }
                },
            }
        }
        drop(session);

        match candidates.get(preferred_name) {
            Some(ip) => {
                let address = Address::new(ip.to_string(), self.options.session_port);
                info!(name = %preferred_name, address = %address, "Controller discovered");
                Ok(address)
            }
            None => {
                let names: Vec<String> = candidates.into_keys().collect();
                warn!(name = %preferred_name, candidates = ?names, "Controller not found");
                Err(DiscoveryError::NotFound {
                    name: preferred_name.to_string(),
                    candidates: names,
                })
            }
        }
    }
}
