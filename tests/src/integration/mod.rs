//! Integration tests driving `ProxyFrameService` through `MemoryFrameHost`.

pub mod handshake_flows;
pub mod request_flows;
