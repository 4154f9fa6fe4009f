//! Port identifiers reported by the host print subsystem
//!
//! Spoolers name the endpoint behind a printer in many ways: Windows port
//! names (`COM3`, `LPT1`, `USB001`, `IP_10.0.0.5`, `FILE:`), CUPS device
//! URIs (`serial:/dev/ttyS0`, `usb://EPSON/TM-T20`, `socket://host:9100`)
//! or plain paths. [`PortInfo::classify`] turns them into a [`PortKind`]
//! plus the endpoint a strategy can act on.

use std::fmt;
use std::path::PathBuf;

/// Default raw TCP port for network thermal printers
pub const RAW_TCP_PORT: u16 = 9100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Serial,
    Parallel,
    /// A filesystem path or device node that accepts raw writes
    File,
    /// USB port owned by the spooler
    Usb,
    /// Raw TCP (JetDirect style)
    Network,
    /// Prompts, XPS, null ports and other non-devices
    Virtual,
    Unknown,
}

impl PortKind {
    /// Whether the endpoint can be opened and written like a file
    pub fn is_direct_writable(self) -> bool {
        matches!(self, PortKind::Serial | PortKind::Parallel | PortKind::File)
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortKind::Serial => "serial",
            PortKind::Parallel => "parallel",
            PortKind::File => "file",
            PortKind::Usb => "usb",
            PortKind::Network => "network",
            PortKind::Virtual => "virtual",
            PortKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A resolved port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Identifier exactly as the spooler reported it
    pub raw: String,
    pub kind: PortKind,
    /// Device path or `host:port`, when one could be derived
    pub endpoint: Option<String>,
}

impl PortInfo {
    pub fn unknown(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            kind: PortKind::Unknown,
            endpoint: None,
        }
    }

    /// Classify a port identifier
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_lowercase();
        let (kind, endpoint) = classify_lower(trimmed, &lower);
        Self {
            raw: trimmed.to_string(),
            kind,
            endpoint,
        }
    }

    /// Path to open for a raw write
    ///
    /// Windows device names map to their `\\.\` namespace form.
    pub fn device_path(&self) -> Option<PathBuf> {
        let endpoint = self.endpoint.as_deref()?;
        match self.kind {
            PortKind::Network | PortKind::Virtual => None,
            _ if is_windows_device(endpoint) => Some(PathBuf::from(format!(
                r"\\.\{}",
                endpoint.trim_end_matches(':')
            ))),
            _ => Some(PathBuf::from(endpoint)),
        }
    }

    /// `host:port` for network ports
    pub fn socket_addr(&self) -> Option<String> {
        match self.kind {
            PortKind::Network => self.endpoint.clone(),
            _ => None,
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.raw, self.kind)
    }
}

fn classify_lower(raw: &str, lower: &str) -> (PortKind, Option<String>) {
    if raw.is_empty() {
        return (PortKind::Unknown, None);
    }

    if is_virtual_port(lower) {
        return (PortKind::Virtual, None);
    }

    // CUPS device URIs
    if let Some(path) = strip_scheme(raw, lower, "serial:") {
        let path = path.split('?').next().unwrap_or(path);
        return (PortKind::Serial, Some(path.to_string()));
    }
    if let Some(path) = strip_scheme(raw, lower, "parallel:") {
        return (PortKind::Parallel, Some(path.to_string()));
    }
    if let Some(path) = strip_scheme(raw, lower, "file:") {
        let path = path.trim_start_matches("//");
        if path.is_empty() {
            return (PortKind::Virtual, None);
        }
        return (PortKind::File, Some(path.to_string()));
    }
    if lower.starts_with("usb:") {
        return (PortKind::Usb, None);
    }
    if let Some(rest) = strip_scheme(raw, lower, "socket://") {
        let host = rest.split(['/', '?']).next().unwrap_or(rest);
        return (PortKind::Network, Some(with_default_port(host)));
    }
    if lower.contains("://") {
        // ipp, lpd, http... only the spooler can talk to these
        return (PortKind::Virtual, None);
    }

    // Windows port names
    if let Some(host) = lower.strip_prefix("ip_") {
        let host = host.split(',').next().unwrap_or(host);
        return (PortKind::Network, Some(with_default_port(host)));
    }
    if has_numbered_prefix(lower, "com") {
        return (PortKind::Serial, Some(raw.to_string()));
    }
    if has_numbered_prefix(lower, "lpt") {
        return (PortKind::Parallel, Some(raw.to_string()));
    }
    if has_numbered_prefix(lower, "usb") {
        return (PortKind::Usb, Some(raw.to_string()));
    }

    // Device nodes and paths
    if lower.starts_with("/dev/tty") {
        return (PortKind::Serial, Some(raw.to_string()));
    }
    if lower.starts_with("/dev/lp") {
        return (PortKind::Parallel, Some(raw.to_string()));
    }
    if raw.starts_with('/') || raw.starts_with(r"\\") || is_drive_path(raw) {
        return (PortKind::File, Some(raw.to_string()));
    }

    (PortKind::Unknown, Some(raw.to_string()))
}

/// Check if a port is a virtual printer port
fn is_virtual_port(p: &str) -> bool {
    p == "file:"
        || p == "portprompt:"
        || p == "xpsport:"
        || p.starts_with("onenote")
        || p == "nul:"
        || p.starts_with("wfsport:")
        || p == "/dev/null"
}

fn strip_scheme<'a>(raw: &'a str, lower: &str, scheme: &str) -> Option<&'a str> {
    if lower.starts_with(scheme) {
        raw.get(scheme.len()..)
    } else {
        None
    }
}

fn has_numbered_prefix(lower: &str, prefix: &str) -> bool {
    lower
        .strip_prefix(prefix)
        .map(|rest| rest.trim_end_matches(':'))
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

fn is_windows_device(endpoint: &str) -> bool {
    let lower = endpoint.to_lowercase();
    has_numbered_prefix(&lower, "com")
        || has_numbered_prefix(&lower, "lpt")
        || has_numbered_prefix(&lower, "usb")
}

fn is_drive_path(raw: &str) -> bool {
    let mut chars = raw.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(d), Some(':'), Some('\\' | '/')) if d.is_ascii_alphabetic()
    )
}

fn with_default_port(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{}:{}", host, RAW_TCP_PORT)
    }
}
