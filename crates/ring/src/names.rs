//! Name derivation for the kernel objects backing a ring.
//!
//! A ring is identified by a shm name with a leading `/`. The three
//! semaphores coordinating it live in the same kernel namespace under names
//! derived here, so producers and consumers agree without exchanging anything
//! beyond the ring name.

/// Names of the three semaphores coordinating one ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemaphoreNames {
    pub free: String,
    pub filled: String,
    pub mutex: String,
}

/// Derive the semaphore names for ring `name`.
///
/// The leading `/` is kept as the namespace prefix; any further `/` inside
/// the name is replaced with `_` since semaphore names may contain only one
/// slash, the leading one.
pub fn semaphore_names(name: &str) -> SemaphoreNames {
    let stem = name.strip_prefix('/').unwrap_or(name).replace('/', "_");
    SemaphoreNames {
        free: format!("/{stem}_free"),
        filled: format!("/{stem}_filled"),
        mutex: format!("/{stem}_mutex"),
    }
}

/// Default ring name for a producer process, unique per pid.
pub fn default_ring_name() -> String {
    format!("/ipc_demo_{}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        let names = semaphore_names("/ring_t1");
        assert_eq!(names.free, "/ring_t1_free");
        assert_eq!(names.filled, "/ring_t1_filled");
        assert_eq!(names.mutex, "/ring_t1_mutex");
    }

    #[test]
    fn test_embedded_slashes_are_flattened() {
        let names = semaphore_names("/demo/ring");
        assert_eq!(names.free, "/demo_ring_free");
        assert_eq!(names.mutex, "/demo_ring_mutex");
    }

    #[test]
    fn test_missing_leading_slash_is_tolerated() {
        let names = semaphore_names("bare");
        assert_eq!(names.filled, "/bare_filled");
    }

    #[test]
    fn test_default_ring_name_is_namespaced() {
        assert!(default_ring_name().starts_with("/ipc_demo_"));
    }
}
