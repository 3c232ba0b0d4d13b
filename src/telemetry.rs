//! Host statistics for the status page.

use std::fmt::Write as _;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Telemetry unavailable: {0}")]
    Unavailable(String),
}

/// Snapshot of host statistics. Fields the platform cannot report are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStats {
    pub cpu_cores: usize,
    pub cpu_model: Option<String>,
    pub free_memory_gb: Option<f64>,
    pub load_average: Option<f64>,
    pub os: String,
    pub total_memory_gb: Option<f64>,
    pub uptime: Option<String>,
}

pub trait Telemetry: Send + Sync {
    fn collect(&self) -> Result<SystemStats, TelemetryError>;
}

/// Reads statistics from the running host
#[derive(Debug, Default, Clone, Copy)]
pub struct HostTelemetry;

impl Telemetry for HostTelemetry {
    fn collect(&self) -> Result<SystemStats, TelemetryError> {
        let mut stats = SystemStats {
            cpu_cores: num_cpus::get(),
            cpu_model: None,
            free_memory_gb: None,
            load_average: None,
            os: std::env::consts::OS.to_string(),
            total_memory_gb: None,
            uptime: None,
        };

        #[cfg(target_os = "linux")]
        {
            let meminfo = read_proc("/proc/meminfo")?;
            stats.total_memory_gb = meminfo_kib(&meminfo, "MemTotal").map(kib_to_gigabytes);
            stats.free_memory_gb = meminfo_kib(&meminfo, "MemFree").map(kib_to_gigabytes);

            let uptime = read_proc("/proc/uptime")?;
            stats.uptime = first_float(&uptime)
                .map(|secs| format_uptime(Duration::from_secs_f64(secs.max(0.0))));

            stats.load_average = first_float(&read_proc("/proc/loadavg")?).map(|l| truncate(l, 2));
            stats.cpu_model = cpu_model(&read_proc("/proc/cpuinfo")?);
        }

        Ok(stats)
    }
}

#[cfg(target_os = "linux")]
fn read_proc(path: &'static str) -> Result<String, TelemetryError> {
    std::fs::read_to_string(path).map_err(|source| TelemetryError::Io { path, source })
}

fn meminfo_kib(meminfo: &str, field: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != field {
            return None;
        }
        rest.split_whitespace().next()?.parse().ok()
    })
}

fn first_float(s: &str) -> Option<f64> {
    s.split_whitespace().next()?.parse().ok()
}

fn cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name.trim() == "model name").then(|| value.trim().to_string())
    })
}

/// Truncate (not round) to `places` decimal places
fn truncate(value: f64, places: i32) -> f64 {
    let shift = 10f64.powi(places);
    (value * shift).trunc() / shift
}

fn kib_to_gigabytes(kib: u64) -> f64 {
    truncate(kib as f64 / (1024.0 * 1024.0), 2)
}

/// Format as `"<d> days, <h> hours, <m> minutes"`
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    format!("{days} days, {hours} hours, {minutes} minutes")
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn or_na<T: std::fmt::Display>(value: Option<T>, suffix: &str) -> String {
    match value {
        Some(v) => escape_html(&format!("{v}{suffix}")),
        None => "n/a".to_string(),
    }
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1.0">
	<title>System Stats</title>
	<style>
		body { font-family: Arial, sans-serif; margin: 40px; padding: 20px; background-color: #f4f4f4; }
		h1 { color: #333; }
		table { width: 100%; border-collapse: collapse; margin: 20px 0; }
		th, td { padding: 12px; border: 1px solid #ddd; text-align: left; }
		th { background-color: #f2f2f2; }
		footer { margin-top: 40px; font-size: 0.9em; color: #666; }
	</style>
</head>
<body>
"#;

/// Render the status page for `stats`
pub fn render_status_page(stats: &SystemStats) -> String {
    let rows = [
        ("Operating System", escape_html(&stats.os)),
        ("CPU Model", or_na(stats.cpu_model.as_deref(), "")),
        ("CPU Cores", stats.cpu_cores.to_string()),
        ("Load Average (1m)", or_na(stats.load_average, "")),
        ("Total Memory", or_na(stats.total_memory_gb, " GB")),
        ("Free Memory", or_na(stats.free_memory_gb, " GB")),
        ("Uptime", or_na(stats.uptime.as_deref(), "")),
    ];

    let mut page = String::from(PAGE_HEAD);
    page.push_str("\t<h1>EnChat is running</h1>\n\t<table>\n");
    for (label, value) in rows {
        let _ = writeln!(page, "\t\t<tr><th>{label}</th><td>{value}</td></tr>");
    }
    page.push_str("\t</table>\n");
    let _ = writeln!(
        page,
        "\t<footer><p>Version {}</p></footer>\n</body>\n</html>",
        env!("CARGO_PKG_VERSION")
    );
    page
}
