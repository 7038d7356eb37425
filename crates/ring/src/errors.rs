use crate::semaphore::SemaphoreError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RingError {
    #[error("failed to open shared memory region {name}: {source}")]
    RegionOpen { name: String, source: io::Error },

    #[error("shared memory region {name} is {actual} bytes, need at least {required}")]
    RegionTooSmall {
        name: String,
        actual: u64,
        required: u64,
    },

    #[error("region {name} has bad magic {found:#010x}")]
    BadMagic { name: String, found: u32 },

    #[error("semaphores for {name} not available after {attempts} attempts")]
    AttachFailed { name: String, attempts: u32 },

    #[error("payload of {len} bytes exceeds slot size {slot_size}")]
    PayloadTooLarge { len: usize, slot_size: u32 },

    #[error("a ring needs at least one slot")]
    ZeroSlots,

    #[error(transparent)]
    Semaphore(#[from] SemaphoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = RingError::RegionTooSmall {
            name: "/r".to_string(),
            actual: 16,
            required: 48,
        };
        assert_eq!(
            err.to_string(),
            "shared memory region /r is 16 bytes, need at least 48"
        );

        let err = RingError::BadMagic {
            name: "/r".to_string(),
            found: 0xDEAD_BEEF,
        };
        assert_eq!(err.to_string(), "region /r has bad magic 0xdeadbeef");

        let err = RingError::PayloadTooLarge {
            len: 300,
            slot_size: 256,
        };
        assert_eq!(
            err.to_string(),
            "payload of 300 bytes exceeds slot size 256"
        );
    }
}
