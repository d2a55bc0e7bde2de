//! Minimal DNS wire format: one A question out, one header check back.

use thiserror::Error;

pub const QTYPE_A: u16 = 1;
pub const QCLASS_IN: u16 = 1;
pub const HEADER_LEN: usize = 12;

const FLAG_QR: u16 = 0x8000;
const FLAG_RD: u16 = 0x0100;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("invalid label {0:?} in query name")]
    InvalidLabel(String),
    #[error("query name longer than 255 bytes")]
    NameTooLong,
    #[error("message of {0} bytes is shorter than a DNS header")]
    Short(usize),
    #[error("response id {got:#06x} does not match query id {want:#06x}")]
    IdMismatch { want: u16, got: u16 },
    #[error("message is not a response")]
    NotResponse,
}

/// Build a recursive query for the A records of `domain`. A trailing dot is
/// accepted.
pub fn build_query(id: u16, domain: &str) -> Result<Vec<u8>, DnsError> {
    let mut out = Vec::with_capacity(HEADER_LEN + domain.len() + 6);
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&FLAG_RD.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    out.extend_from_slice(&[0u8; 6]); // AN/NS/AR

    let name = domain.strip_suffix('.').unwrap_or(domain);
    let name_start = out.len();
    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty() || label.len() > 63 {
                return Err(DnsError::InvalidLabel(label.to_string()));
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);
    if out.len() - name_start > 255 {
        return Err(DnsError::NameTooLong);
    }

    out.extend_from_slice(&QTYPE_A.to_be_bytes());
    out.extend_from_slice(&QCLASS_IN.to_be_bytes());
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
}

impl Header {
    pub fn parse(msg: &[u8]) -> Result<Self, DnsError> {
        if msg.len() < HEADER_LEN {
            return Err(DnsError::Short(msg.len()));
        }
        Ok(Self {
            id: u16::from_be_bytes([msg[0], msg[1]]),
            flags: u16::from_be_bytes([msg[2], msg[3]]),
        })
    }

    pub fn is_response(&self) -> bool {
        self.flags & FLAG_QR != 0
    }

    pub fn rcode(&self) -> u8 {
        (self.flags & 0x000F) as u8
    }
}

/// Accept `msg` as the answer to query `id`. Any RCODE counts: the resolver
/// was reached.
pub fn check_response(id: u16, msg: &[u8]) -> Result<Header, DnsError> {
    let header = Header::parse(msg)?;
    if header.id != id {
        return Err(DnsError::IdMismatch {
            want: id,
            got: header.id,
        });
    }
    if !header.is_response() {
        return Err(DnsError::NotResponse);
    }
    Ok(header)
}
