//! SOCKS-style target address: ATYP + ADDR + PORT.

use std::io;
use std::net::IpAddr;

const ATYP_V4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_V6: u8 = 0x04;

/// Append the encoded `host:port` to `buf`. IP literals use the binary
/// forms; anything else is sent as a domain name of at most 255 bytes.
pub fn encode_target(host: &str, port: u16, buf: &mut Vec<u8>) -> io::Result<()> {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            buf.push(ATYP_V4);
            buf.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            buf.push(ATYP_V6);
            buf.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            let name = host.as_bytes();
            if name.is_empty() || name.len() > 255 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("target host length {} out of range 1..=255", name.len()),
                ));
            }
            buf.push(ATYP_DOMAIN);
            buf.push(name.len() as u8);
            buf.extend_from_slice(name);
        }
    }
    buf.extend_from_slice(&port.to_be_bytes());
    Ok(())
}

/// Length of the encoded address at the start of `buf`, or `None` if the
/// type is unknown or the buffer is too short.
pub fn encoded_len(buf: &[u8]) -> Option<usize> {
    let len = match *buf.first()? {
        ATYP_V4 => 1 + 4 + 2,
        ATYP_V6 => 1 + 16 + 2,
        ATYP_DOMAIN => 1 + 1 + *buf.get(1)? as usize + 2,
        _ => return None,
    };
    (buf.len() >= len).then_some(len)
}
