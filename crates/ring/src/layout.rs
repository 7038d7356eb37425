use std::mem;
use std::sync::atomic::AtomicU32;

/// Sentinel confirming a mapped region holds an initialized ring.
pub const RING_MAGIC: u32 = 0xA1B2_C3D4;

/// Current layout version.
pub const LAYOUT_VERSION: u32 = 1;

/// Bytes of the per-slot length prefix.
pub const LEN_PREFIX_SIZE: usize = mem::size_of::<u32>();

/// SHARING & MEMORY ORDERING:
///
/// This header sits at offset 0 of the mapped region and is shared read/write
/// across every attached process.
///
/// `magic`, `version`, `slot_count` and `slot_size` are written once by the
/// owner before any peer can open the semaphores, and are read-only afterwards.
///
/// `head` and `tail` are the live cursors. The writer advances `tail`, a
/// reader advances `head`, and every access happens while holding the mutex
/// semaphore. They are atomics anyway: plain fields mutated through a shared
/// mapping would be torn-read bait, and the Acquire/Release pairs document the
/// cross-process visibility the semaphores already enforce.
///
/// Alignment:
/// `#[repr(C)]` with only `u32`-sized fields gives a 4-byte aligned, padding-
/// free layout, so the slot area starts at a predictable offset on every
/// architecture.
#[repr(C)]
pub struct RingHeader {
    pub magic: u32,
    pub version: u32,
    pub slot_count: u32,
    pub slot_size: u32,
    pub head: AtomicU32,
    pub tail: AtomicU32,
    pub reserved: [u8; 24],
}

impl RingHeader {
    pub const SIZE: usize = mem::size_of::<Self>();
}

/// Total bytes a ring with the given geometry occupies.
pub fn region_size(slot_count: u32, slot_size: u32) -> usize {
    RingHeader::SIZE + slot_count as usize * (LEN_PREFIX_SIZE + slot_size as usize)
}

/// Byte offset of slot `idx`'s length prefix. All slot addressing in the
/// crate goes through this one function.
pub fn slot_offset(idx: u32, slot_size: u32) -> usize {
    RingHeader::SIZE + idx as usize * (LEN_PREFIX_SIZE + slot_size as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(
            RingHeader::SIZE,
            48,
            "header must be exactly 48 bytes so the slot area lands where peers expect it"
        );
    }

    #[test]
    fn test_header_alignment() {
        assert_eq!(
            mem::align_of::<RingHeader>(),
            4,
            "header must be 4-byte aligned for the AtomicU32 cursors"
        );
    }

    #[test]
    fn test_region_size() {
        // 48 + 4 * (4 + 64)
        assert_eq!(region_size(4, 64), 48 + 4 * 68);
        // degenerate but legal: zero-byte payloads still carry a length prefix
        assert_eq!(region_size(2, 0), 48 + 2 * 4);
    }

    #[test]
    fn test_slot_offset() {
        assert_eq!(slot_offset(0, 64), 48);
        assert_eq!(slot_offset(1, 64), 48 + 68);
        assert_eq!(slot_offset(3, 256), 48 + 3 * 260);
    }
}
