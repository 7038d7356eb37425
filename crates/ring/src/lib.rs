pub mod errors;
pub mod layout;
pub mod names;
mod region;
pub mod semaphore;
pub mod shared_ring;

pub use errors::RingError;
pub use semaphore::{Semaphore, SemaphoreError};
pub use shared_ring::SharedRing;
