pub mod broker;
pub mod errors;
pub mod participant;
pub mod paths;
pub mod protocol;

pub use broker::Broker;
pub use errors::DiscoveryError;
pub use participant::{Participant, Role};
pub use protocol::PeerNotice;
