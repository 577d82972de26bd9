//! Host facts for the dashboard

use serde::Serialize;
use std::path::Path;
use sysinfo::{Components, MemoryRefreshKind, RefreshKind, System};
use tracing::debug;

const NOT_AVAILABLE: &str = "N/A";

/// Board model string on device-tree systems (Raspberry Pi and friends)
const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub hostname: String,
    pub board_model: String,
    pub cpu_temp: String,
    pub memory: String,
    pub uptime: String,
    pub version: String,
}

impl SystemInfo {
    /// Collect from the live system. Each field degrades to "N/A" on its own.
    pub fn collect() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        let components = Components::new_with_refreshed_list();
        let readings = components
            .list()
            .iter()
            .map(|c| (c.label(), c.temperature()));

        Self {
            os: or_na(System::long_os_version()),
            hostname: or_na(System::host_name().filter(|h| !h.trim().is_empty())),
            board_model: or_na(read_board_model(Path::new(DEVICE_TREE_MODEL))),
            cpu_temp: or_na(cpu_temperature(readings).map(format_temperature)),
            memory: or_na(format_memory(system.total_memory(), system.available_memory())),
            uptime: format_uptime(System::uptime()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Device-tree model, without the trailing NUL the kernel appends
pub fn read_board_model(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .map_err(|e| debug!(path = %path.display(), error = %e, "Board model unavailable"))
        .ok()
        .map(|s| s.trim_end_matches('\0').trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Temperature of the CPU sensor, or of the first sensor reporting one
pub fn cpu_temperature<'a>(readings: impl IntoIterator<Item = (&'a str, Option<f32>)>) -> Option<f32> {
    let readings: Vec<(&str, f32)> = readings
        .into_iter()
        .filter_map(|(label, temp)| Some((label, temp.filter(|t| t.is_finite())?)))
        .collect();

    readings
        .iter()
        .find(|(label, _)| label.to_lowercase().contains("cpu"))
        .or_else(|| readings.first())
        .map(|(_, temp)| *temp)
}

pub fn format_temperature(celsius: f32) -> String {
    format!("{:.1}°C", celsius)
}

/// `"Used: <n>MB / Total: <n>MB"` from byte counts; None when no RAM was read
pub fn format_memory(total_bytes: u64, available_bytes: u64) -> Option<String> {
    if total_bytes == 0 {
        return None;
    }
    let total = total_bytes / (1024 * 1024);
    let available = available_bytes / (1024 * 1024);
    Some(format!(
        "Used: {}MB / Total: {}MB",
        total.saturating_sub(available),
        total
    ))
}

/// `"<d>d <h>h <m>m"`
pub fn format_uptime(seconds: u64) -> String {
    format!(
        "{}d {}h {}m",
        seconds / 86_400,
        (seconds % 86_400) / 3_600,
        (seconds % 3_600) / 60
    )
}
