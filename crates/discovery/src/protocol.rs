//! The ASCII datagram grammar spoken between participants and the broker.
//!
//! Requests flow client -> broker:
//!
//! ```text
//! REGISTER   <service_key> <client_address> <ring_name_or_->
//! DEREGISTER <service_key> <client_address> <ring_name_or_->
//! ```
//!
//! Notifications flow broker -> client:
//!
//! ```text
//! PEER <service_key> <peer_address> <peer_ring_or_->
//! ```
//!
//! Tokens are whitespace-delimited, one message per datagram, `-` standing
//! in for "no ring".

use std::fmt;
use thiserror::Error;

/// Largest datagram either side will send or accept.
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// Wire token for an absent ring name.
pub const NO_RING: &str = "-";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("datagram is not valid UTF-8")]
    NotUtf8,
    #[error("unrecognised command: {0}")]
    UnknownCommand(String),
    #[error("missing {0} field")]
    MissingField(&'static str),
}

/// One participant as it announces itself: who it serves, where to send
/// datagrams, and which ring it offers (producers) or `None` (consumers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub service: String,
    pub address: String,
    pub ring: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Register(Registration),
    Deregister(Registration),
}

/// A broker notification telling one participant about another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerNotice {
    pub service: String,
    pub address: String,
    pub ring: Option<String>,
}

fn ring_from_token(token: &str) -> Option<String> {
    if token == NO_RING {
        None
    } else {
        Some(token.to_string())
    }
}

fn ring_to_token(ring: &Option<String>) -> &str {
    ring.as_deref().unwrap_or(NO_RING)
}

fn parse_fields<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<(String, String, Option<String>), ProtocolError> {
    let service = tokens
        .next()
        .ok_or(ProtocolError::MissingField("service key"))?;
    let address = tokens
        .next()
        .ok_or(ProtocolError::MissingField("client address"))?;
    let ring = tokens
        .next()
        .ok_or(ProtocolError::MissingField("ring name"))?;
    Ok((
        service.to_string(),
        address.to_string(),
        ring_from_token(ring),
    ))
}

impl Request {
    pub fn parse(datagram: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(datagram).map_err(|_| ProtocolError::NotUtf8)?;
        let mut tokens = text.split_whitespace();
        let command = tokens.next().ok_or(ProtocolError::MissingField("command"))?;
        match command {
            "REGISTER" => {
                let (service, address, ring) = parse_fields(&mut tokens)?;
                Ok(Request::Register(Registration {
                    service,
                    address,
                    ring,
                }))
            }
            "DEREGISTER" => {
                let (service, address, ring) = parse_fields(&mut tokens)?;
                Ok(Request::Deregister(Registration {
                    service,
                    address,
                    ring,
                }))
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (verb, reg) = match self {
            Request::Register(reg) => ("REGISTER", reg),
            Request::Deregister(reg) => ("DEREGISTER", reg),
        };
        write!(
            f,
            "{verb} {} {} {}",
            reg.service,
            reg.address,
            ring_to_token(&reg.ring)
        )
    }
}

impl PeerNotice {
    pub fn parse(datagram: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(datagram).map_err(|_| ProtocolError::NotUtf8)?;
        let mut tokens = text.split_whitespace();
        match tokens.next().ok_or(ProtocolError::MissingField("command"))? {
            "PEER" => {
                let (service, address, ring) = parse_fields(&mut tokens)?;
                Ok(PeerNotice {
                    service,
                    address,
                    ring,
                })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for PeerNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PEER {} {} {}",
            self.service,
            self.address,
            ring_to_token(&self.ring)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_register_with_ring() {
        let request = Request::parse(b"REGISTER demo /tmp/p.sock /ring1").unwrap();
        assert_eq!(
            request,
            Request::Register(Registration {
                service: "demo".to_string(),
                address: "/tmp/p.sock".to_string(),
                ring: Some("/ring1".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_register_without_ring() {
        let request = Request::parse(b"REGISTER demo /tmp/c.sock -").unwrap();
        match request {
            Request::Register(reg) => assert_eq!(reg.ring, None, "dash means no ring"),
            _ => panic!("expected Register"),
        }
    }

    #[test]
    fn test_parse_deregister() {
        let request = Request::parse(b"DEREGISTER demo /tmp/p.sock /ring1").unwrap();
        assert!(matches!(request, Request::Deregister(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert_eq!(
            Request::parse(b"HELLO world"),
            Err(ProtocolError::UnknownCommand("HELLO".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_short_message() {
        assert_eq!(
            Request::parse(b"REGISTER demo"),
            Err(ProtocolError::MissingField("client address"))
        );
        assert_eq!(
            Request::parse(b""),
            Err(ProtocolError::MissingField("command"))
        );
    }

    #[test]
    fn test_parse_rejects_binary_noise() {
        assert_eq!(Request::parse(&[0xFF, 0xFE, 0x00]), Err(ProtocolError::NotUtf8));
    }

    #[test]
    fn test_request_wire_form_round_trips() {
        let request = Request::Register(Registration {
            service: "demo".to_string(),
            address: "/tmp/p.sock".to_string(),
            ring: Some("/r1".to_string()),
        });
        assert_eq!(request.to_string(), "REGISTER demo /tmp/p.sock /r1");
        assert_eq!(Request::parse(request.to_string().as_bytes()).unwrap(), request);

        let request = Request::Deregister(Registration {
            service: "demo".to_string(),
            address: "/tmp/c.sock".to_string(),
            ring: None,
        });
        assert_eq!(request.to_string(), "DEREGISTER demo /tmp/c.sock -");
    }

    #[test]
    fn test_peer_notice_round_trips() {
        let notice = PeerNotice {
            service: "demo".to_string(),
            address: "/tmp/p.sock".to_string(),
            ring: Some("/r1".to_string()),
        };
        assert_eq!(notice.to_string(), "PEER demo /tmp/p.sock /r1");
        assert_eq!(PeerNotice::parse(notice.to_string().as_bytes()).unwrap(), notice);
    }

    #[test]
    fn test_peer_notice_rejects_requests() {
        assert_eq!(
            PeerNotice::parse(b"REGISTER demo /tmp/p.sock -"),
            Err(ProtocolError::UnknownCommand("REGISTER".to_string()))
        );
    }
}
