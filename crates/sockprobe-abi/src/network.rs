//! Host network stack as a `NetworkService`.
//!
//! The host stack is always up; starting it only prepares the storage
//! directory, and joining records the network id. An address counts as
//! assigned once any interface on the host carries one.

use std::net::IpAddr;
use std::path::Path;

use sockprobe_core::NetworkService;

use crate::sockaddr::ip_of;

#[derive(Debug, Default)]
pub struct HostNetwork {
    joined: Option<String>,
}

impl HostNetwork {
    #[must_use]
    pub const fn new() -> Self {
        Self { joined: None }
    }

    #[must_use]
    pub fn joined(&self) -> Option<&str> {
        self.joined.as_deref()
    }
}

impl NetworkService for HostNetwork {
    fn start(&mut self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn is_running(&self) -> bool {
        true
    }

    fn join(&mut self, network_id: &str) -> std::io::Result<()> {
        self.joined = Some(network_id.to_string());
        Ok(())
    }

    fn has_address(&self, network_id: &str) -> bool {
        self.joined.as_deref() == Some(network_id)
            && interface_addresses().is_ok_and(|addrs| !addrs.is_empty())
    }
}

/// Every IPv4/IPv6 address configured on a host interface.
pub fn interface_addresses() -> std::io::Result<Vec<IpAddr>> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: `head` is a valid out-pointer.
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let mut addrs = Vec::new();
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: every node in the list stays valid until freeifaddrs.
        let entry = unsafe { &*cursor };
        // SAFETY: ifa_addr is null or points at a sockaddr of its family.
        if let Some(ip) = unsafe { ip_of(entry.ifa_addr) } {
            addrs.push(ip);
        }
        cursor = entry.ifa_next;
    }
    // SAFETY: `head` came from getifaddrs and is freed once.
    unsafe { libc::freeifaddrs(head) };
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_is_listed() {
        let addrs = interface_addresses().unwrap();
        assert!(addrs.iter().any(IpAddr::is_loopback), "{addrs:?}");
    }

    #[test]
    fn address_waits_for_the_joined_network() {
        let mut net = HostNetwork::new();
        assert!(net.is_running());
        assert!(!net.has_address("8056c2e21c000001"));
        net.join("8056c2e21c000001").unwrap();
        assert_eq!(net.joined(), Some("8056c2e21c000001"));
        assert!(net.has_address("8056c2e21c000001"));
        assert!(!net.has_address("ffffffffffffffff"));
    }
}
