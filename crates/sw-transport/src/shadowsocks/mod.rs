//! # Shadowsocks AEAD client / Shadowsocks AEAD 客户端
//!
//! Stream and packet dialers that tunnel through a Shadowsocks server
//! (SIP004 AEAD ciphers).

mod address;
mod cipher;
mod dialer;
mod packet;
mod salt;
mod stream;

pub use address::{encode_target, encoded_len};
pub use cipher::{CipherError, CipherKind, EncryptionKey, SessionCipher, TAG_LEN};
pub use dialer::{ShadowsocksPacketDialer, ShadowsocksStreamDialer};
pub use packet::{pack, unpack, ShadowsocksPacketConn};
pub use salt::{PrefixSaltGenerator, RandomSaltGenerator, SaltGenerator};
pub use stream::{SsStream, MAX_PAYLOAD};
