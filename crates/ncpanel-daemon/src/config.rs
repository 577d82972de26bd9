//! Configuration loading and validation

use anyhow::Result;
use ncpanel_core::Address;
use ncpanel_discovery::{DiscoveryOptions, FLUIDNC_SERVICE_TYPE};
use ncpanel_display::{FramebufferSink, LogSink, PixelFormat, PixelSink};
use ncpanel_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub session: SessionTimingConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// mDNS instance name the controller advertises
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Fixed controller address; skips discovery when set
    #[serde(default)]
    pub static_ip: Option<String>,
    /// WebSocket port
    #[serde(default = "default_port")]
    pub port: u16,
    /// WebSocket path
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            static_ip: None,
            port: default_port(),
            path: default_path(),
        }
    }
}

fn default_hostname() -> String {
    "fluidnc".to_string()
}

fn default_port() -> u16 {
    81
}

fn default_path() -> String {
    "/ws".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimingConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Upper bound on a single receive
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_ms: u64,
    /// Silence longer than this drops the session
    #[serde(default = "default_keepalive_grace")]
    pub keepalive_grace_secs: u64,
}

impl Default for SessionTimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            keepalive_interval_secs: default_keepalive_interval(),
            retry_delay_secs: default_retry_delay(),
            receive_timeout_ms: default_receive_timeout(),
            keepalive_grace_secs: default_keepalive_grace(),
        }
    }
}

fn default_poll_interval() -> u64 {
    200
}

fn default_keepalive_interval() -> u64 {
    5
}

fn default_retry_delay() -> u64 {
    5
}

fn default_receive_timeout() -> u64 {
    50
}

fn default_keepalive_grace() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Browse window in seconds
    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_service_type")]
    pub service_type: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_discovery_timeout(),
            service_type: default_service_type(),
        }
    }
}

fn default_discovery_timeout() -> u64 {
    5
}

fn default_service_type() -> String {
    FLUIDNC_SERVICE_TYPE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Frame-buffer device; headless when absent
    #[serde(default)]
    pub device: Option<PathBuf>,
    #[serde(default)]
    pub pixel_format: PixelFormat,
    #[serde(default = "default_brightness")]
    pub brightness: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            device: None,
            pixel_format: PixelFormat::default(),
            brightness: default_brightness(),
        }
    }
}

fn default_width() -> u32 {
    64
}

fn default_height() -> u32 {
    32
}

fn default_brightness() -> u8 {
    255
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log file alongside the console; console only when absent
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Rotated files kept on disk
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            max_files: default_max_log_files(),
        }
    }
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    pub fn to_session_config(&self) -> SessionConfig {
        let s = &self.session;
        SessionConfig {
            poll_interval: Duration::from_millis(s.poll_interval_ms),
            keepalive_interval: Duration::from_secs(s.keepalive_interval_secs),
            retry_delay: Duration::from_secs(s.retry_delay_secs),
            receive_timeout: Duration::from_millis(s.receive_timeout_ms),
            keepalive_grace: Duration::from_secs(s.keepalive_grace_secs),
        }
    }

    pub fn to_discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            service_type: self.discovery.service_type.clone(),
            timeout_secs: self.discovery.timeout_secs,
            session_port: self.controller.port,
        }
    }

    /// Configured address, if discovery is to be skipped
    pub fn static_address(&self) -> Option<Address> {
        self.controller
            .static_ip
            .as_ref()
            .filter(|ip| !ip.trim().is_empty())
            .map(|ip| Address::new(ip.trim(), self.controller.port))
    }

    /// Open the configured pixel sink
    pub fn open_sink(&self) -> Result<Box<dyn PixelSink>> {
        let d = &self.display;
        match &d.device {
            Some(path) => Ok(Box::new(FramebufferSink::open(
                path,
                d.pixel_format,
                d.brightness,
                d.width,
                d.height,
            )?)),
            None => {
                info!("No display device configured, running headless");
                Ok(Box::new(LogSink::new()))
            }
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.controller.hostname, "fluidnc");
        assert_eq!(config.controller.port, 81);
        assert_eq!(config.controller.path, "/ws");
        assert!(config.static_address().is_none());
        assert_eq!(config.display.width, 64);
        assert_eq!(config.display.height, 32);
        assert_eq!(config.display.pixel_format, PixelFormat::Rgb565);
        assert!(!config.dashboard.enabled);
        assert_eq!(config.dashboard.bind, "0.0.0.0:5000");
        assert!(config.logging.file.is_none());
        assert_eq!(config.logging.max_files, 5);

        let session = config.to_session_config();
        assert_eq!(session.poll_interval, Duration::from_millis(200));
        assert_eq!(session.retry_delay, Duration::from_secs(5));
        assert_eq!(session.keepalive_grace, Duration::from_secs(15));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[controller]
hostname = "mill"
static_ip = "192.168.1.50"
port = 8081

[session]
poll_interval_ms = 500

[display]
device = "/dev/fb1"
pixel_format = "rgb888"

[logging]
file = "/var/log/ncpanel/ncpanel.log"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.controller.hostname, "mill");
        assert_eq!(
            config.static_address(),
            Some(Address::new("192.168.1.50", 8081))
        );
        assert_eq!(config.to_session_config().poll_interval, Duration::from_millis(500));
        assert_eq!(config.session.retry_delay_secs, 5);
        assert_eq!(config.display.device, Some(PathBuf::from("/dev/fb1")));
        assert_eq!(config.display.pixel_format, PixelFormat::Rgb888);
        assert_eq!(config.display.brightness, 255);
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/var/log/ncpanel/ncpanel.log"))
        );
        assert_eq!(config.logging.max_files, 5);

        let options = config.to_discovery_options();
        assert_eq!(options.session_port, 8081);
        assert_eq!(options.service_type, FLUIDNC_SERVICE_TYPE);
    }

    #[test]
    fn test_blank_static_ip_means_discovery() {
        let mut config = Config::default();
        config.controller.static_ip = Some("  ".to_string());
        assert!(config.static_address().is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[session]\npoll_interval_ms = \"fast\"").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_device_is_hardware_error() {
        let mut config = Config::default();
        config.display.device = Some(PathBuf::from("/nonexistent/fb9"));
        assert!(config.open_sink().is_err());
    }
}
