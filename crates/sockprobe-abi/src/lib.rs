//! # sockprobe-abi
//!
//! Host backend for sockprobe runs.
//!
//! [`HostSocketApi`] implements the core `SocketApi` trait with direct
//! `libc` calls, capturing `errno` immediately after each failing call.
//! [`HostNetwork`] implements `NetworkService` for the host network stack.
//!
//! ```text
//! orchestrator -> TransferSession -> HostSocketApi -> libc -> kernel
//! ```

mod network;
mod sockaddr;
mod socket;

pub use network::{HostNetwork, interface_addresses};
pub use socket::HostSocketApi;
