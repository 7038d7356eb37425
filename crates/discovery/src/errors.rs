use crate::protocol::ProtocolError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
