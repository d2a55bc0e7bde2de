//! TLS record fragmentation.
//! TLS 记录分片。
//!
//! Splits the first handshake record of a connection into two records at a
//! configured payload offset, so classifiers keyed on the size or shape of
//! the initial ClientHello record see two smaller records instead. A TLS
//! peer reassembles the handshake message transparently.
//!
//! ```text
//! in : [16 03 01 00 10][p0 .. p15]
//! out: [16 03 01 00 04][p0 .. p3][16 03 01 00 0c][p4 .. p15]
//! ```
//!
//! Only the first record observed is considered. Whatever the outcome
//! (split, pass-through, or error), the transform disarms after its first
//! decision and never looks at the stream again.

mod dialer;
mod plan;
mod record;
mod stream;
mod writer;

pub use dialer::TlsFragDialer;
pub use plan::{can_decide, logical_len, Availability, Skip, SplitPlan, SplitState};
pub use record::{RecordHeader, CONTENT_TYPE_HANDSHAKE, HEADER_SIZE, MAX_FRAGMENT_PAYLOAD};
pub use stream::FragStream;
pub use writer::FragWriter;
