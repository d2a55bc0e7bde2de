//! # sw-transport: composable dialers / 可组合拨号器
//!
//! Stream and packet dialers that wrap one another to build a connection
//! path: direct TCP/UDP at the bottom, optionally a Shadowsocks tunnel, and
//! optionally TLS record fragmentation on top.
//!
//! 可相互包装的流/数据报拨号器：直连、Shadowsocks 隧道与 TLS 记录分片。
//!
//! ## Modules / 模块
//! - `dialer`: `StreamDialer` / `PacketDialer` contracts plus direct TCP/UDP
//! - `endpoint`: a dialer pinned to one server address
//! - `shadowsocks`: AEAD Shadowsocks client
//! - `tlsfrag`: split the first TLS handshake record of a connection
//! - `mem`: in-memory dialer for tests

pub mod dialer;
pub mod endpoint;
pub mod mem;
pub mod shadowsocks;
pub mod tlsfrag;

pub use dialer::{
    AsyncReadWrite, BoxPacketConn, DialError, IoStream, PacketConn, PacketDialer, StreamDialer,
    TcpDialer, UdpDialer,
};
pub use endpoint::{join_host_port, split_host_port, PacketEndpoint, StreamEndpoint};
pub use mem::DuplexDialer;
