//! Network interface binding.
//!
//! Probes can be pinned to one interface (for example a VPN tunnel) so that
//! checks reflect what a torrent client bound to the same interface would see.
//! Binding goes through the [`InterfaceBinder`] capability; [`DeviceBinder`]
//! is the OS-backed implementation.

use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Interface a batch should run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSelection {
    pub name: String,
    /// When set, a failed bind fails the probe instead of falling back
    pub required: bool,
}

impl InterfaceSelection {
    /// Returns `None` for a blank name, which means "no interface selected".
    pub fn new(name: impl Into<String>, required: bool) -> Option<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            None
        } else {
            Some(Self { name, required })
        }
    }
}

/// Why a socket or client could not be bound to an interface.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("Interface binding is not supported on this platform")]
    Unsupported,

    #[error("Unknown network interface: {0}")]
    UnknownInterface(String),

    #[error("Permission denied binding to {0}")]
    PermissionDenied(String),

    #[error("Failed to bind to interface: {0}")]
    Io(#[from] io::Error),
}

/// Capability for pinning connections to a named interface.
pub trait InterfaceBinder: Send + Sync {
    /// Binds an unconnected UDP socket to `interface`.
    fn bind_socket(&self, socket: &socket2::Socket, interface: &str) -> Result<(), BindError>;

    /// Configures an HTTP client builder so its connections use `interface`.
    fn bind_http(
        &self,
        builder: reqwest::ClientBuilder,
        interface: &str,
    ) -> Result<reqwest::ClientBuilder, BindError>;
}

/// Kind of a detected interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Vpn,
    Loopback,
    Other,
}

/// A network interface present on this host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub kind: InterfaceKind,
}

impl InterfaceInfo {
    pub fn from_name(name: &str) -> Self {
        let kind = if name == "lo" || name.starts_with("lo0") {
            InterfaceKind::Loopback
        } else if ["tun", "tap", "wg", "ppp"].iter().any(|p| name.contains(p)) {
            InterfaceKind::Vpn
        } else {
            InterfaceKind::Other
        };
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

const SYS_CLASS_NET: &str = "/sys/class/net";

/// Binds with `SO_BINDTODEVICE` on Linux-like systems.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceBinder;

impl DeviceBinder {
    /// Lists interfaces known to the kernel, sorted by name.
    ///
    /// Empty where the platform offers no listing.
    pub fn available_interfaces() -> Vec<InterfaceInfo> {
        let Ok(entries) = std::fs::read_dir(SYS_CLASS_NET) else {
            return Vec::new();
        };
        let mut interfaces: Vec<InterfaceInfo> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .map(|name| InterfaceInfo::from_name(&name))
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        interfaces
    }

    #[cfg_attr(
        not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")),
        allow(dead_code)
    )]
    fn ensure_exists(interface: &str) -> Result<(), BindError> {
        let sys = Path::new(SYS_CLASS_NET);
        if sys.exists() && !sys.join(interface).exists() {
            return Err(BindError::UnknownInterface(interface.to_string()));
        }
        Ok(())
    }
}

#[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
impl InterfaceBinder for DeviceBinder {
    fn bind_socket(&self, socket: &socket2::Socket, interface: &str) -> Result<(), BindError> {
        Self::ensure_exists(interface)?;
        socket
            .bind_device(Some(interface.as_bytes()))
            .map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => {
                    BindError::PermissionDenied(interface.to_string())
                }
                // ENODEV
                _ if e.raw_os_error() == Some(19) => {
                    BindError::UnknownInterface(interface.to_string())
                }
                _ => BindError::Io(e),
            })
    }

    fn bind_http(
        &self,
        builder: reqwest::ClientBuilder,
        interface: &str,
    ) -> Result<reqwest::ClientBuilder, BindError> {
        Self::ensure_exists(interface)?;
        Ok(builder.interface(interface))
    }
}

#[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
impl InterfaceBinder for DeviceBinder {
    fn bind_socket(&self, _socket: &socket2::Socket, _interface: &str) -> Result<(), BindError> {
        Err(BindError::Unsupported)
    }

    fn bind_http(
        &self,
        _builder: reqwest::ClientBuilder,
        _interface: &str,
    ) -> Result<reqwest::ClientBuilder, BindError> {
        Err(BindError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_selection_is_none() {
        assert_eq!(InterfaceSelection::new("", true), None);
        assert_eq!(InterfaceSelection::new("   ", false), None);
        assert_eq!(
            InterfaceSelection::new(" wg0 ", true),
            Some(InterfaceSelection {
                name: "wg0".into(),
                required: true
            })
        );
    }

    #[test]
    fn test_interface_kind() {
        assert_eq!(InterfaceInfo::from_name("tun0").kind, InterfaceKind::Vpn);
        assert_eq!(InterfaceInfo::from_name("wg-home").kind, InterfaceKind::Vpn);
        assert_eq!(InterfaceInfo::from_name("lo").kind, InterfaceKind::Loopback);
        assert_eq!(InterfaceInfo::from_name("eth0").kind, InterfaceKind::Other);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unknown_interface_is_rejected() {
        let socket = socket2::Socket::new(
            socket2::Domain::IPV4,
            socket2::Type::DGRAM,
            Some(socket2::Protocol::UDP),
        )
        .unwrap();
        let err = DeviceBinder
            .bind_socket(&socket, "no-such-iface0")
            .unwrap_err();
        assert!(matches!(
            err,
            BindError::UnknownInterface(_) | BindError::PermissionDenied(_)
        ));
    }
}
