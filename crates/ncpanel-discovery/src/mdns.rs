//! mDNS browsing via mdns-sd

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::browser::{Advertisement, Browse, BrowseSession};
use crate::service::DiscoveryError;

/// Advertisements buffered between the mDNS thread and the async side
const EVENT_BUFFER: usize = 32;

/// Browser backed by an mdns-sd daemon created per browse session
#[derive(Debug, Default, Clone, Copy)]
pub struct MdnsBrowser;

impl MdnsBrowser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Browse for MdnsBrowser {
    async fn open(&self, service_type: &str) -> Result<Box<dyn BrowseSession>, DiscoveryError> {
        let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError::Browse(e.to_string()))?;
        let receiver = match daemon.browse(service_type) {
            Ok(r) => r,
            Err(e) => {
                let _ = daemon.shutdown();
                return Err(DiscoveryError::Browse(e.to_string()));
            }
        };

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let suffix = service_type.to_string();

        // mdns-sd delivers events on a blocking channel; forward resolved
        // services until either side goes away.
        std::thread::Builder::new()
            .name("mdns-browse".to_string())
            .spawn(move || {
                while let Ok(event) = receiver.recv() {
                    match event {
                        ServiceEvent::ServiceResolved(info) => {
                            let ad = Advertisement {
                                name: instance_name(info.get_fullname(), &suffix),
                                hostname: info.get_hostname().to_string(),
                                addresses: info.get_addresses().iter().copied().collect(),
                                port: info.get_port(),
                            };
                            if tx.blocking_send(ad).is_err() {
                                break;
                            }
                        }
                        ServiceEvent::SearchStopped(_) => break,
                        other => trace!(event = ?other, "mDNS event"),
                    }
                }
            })
            .map_err(|e| DiscoveryError::Browse(e.to_string()))?;

        debug!(service_type = %service_type, "mDNS browse started");
        Ok(Box::new(MdnsSession {
            daemon,
            service_type: service_type.to_string(),
            rx,
        }))
    }
}

struct MdnsSession {
    daemon: ServiceDaemon,
    service_type: String,
    rx: mpsc::Receiver<Advertisement>,
}

#[async_trait]
impl BrowseSession for MdnsSession {
    async fn next(&mut self) -> Option<Advertisement> {
        self.rx.recv().await
    }
}

impl Drop for MdnsSession {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            trace!(error = %e, "stop_browse failed");
        }
        if let Err(e) = self.daemon.shutdown() {
            warn!(error = %e, "Failed to shut down mDNS daemon");
        }
        debug!(service_type = %self.service_type, "mDNS browse closed");
    }
}

/// Strip the service-type suffix from a full instance name
fn instance_name(fullname: &str, service_type: &str) -> String {
    fullname
        .strip_suffix(service_type)
        .map(|s| s.trim_end_matches('.'))
        .unwrap_or(fullname)
        .to_string()
}
