//! The shared ring: a header plus N length-prefixed slots in one mapped
//! region, coordinated by three named semaphores.
//!
//! Exactly one process creates the ring (the owner); everyone else attaches.
//! The owner is the only process whose [`SharedRing::unlink_resources`] does
//! anything. Dropping any handle merely detaches: semaphores are closed and
//! the region unmapped, the kernel objects live on.

use crate::errors::RingError;
use crate::layout::{self, RingHeader, LAYOUT_VERSION, LEN_PREFIX_SIZE, RING_MAGIC};
use crate::names::{self, SemaphoreNames};
use crate::region;
use crate::semaphore::Semaphore;
use memmap2::MmapMut;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

/// How often an attachee retries opening the semaphores while the owner is
/// still mid-initialization. 20 x 100ms keeps the whole window around two
/// seconds so misuse surfaces promptly.
const ATTACH_ATTEMPTS: u32 = 20;
const ATTACH_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct SharedRing {
    name: String,
    map: MmapMut,
    slot_count: u32,
    slot_size: u32,
    owner: bool,
    free: Semaphore,
    filled: Semaphore,
    mutex: Semaphore,
    sem_names: SemaphoreNames,
}

impl SharedRing {
    /// Create a new ring under `name` and become its owner.
    ///
    /// Claims the shm name exclusively, sizes and maps the region, creates
    /// the three semaphores (free = `slot_count`, filled = 0, mutex = 1),
    /// writes the header and zeroes the slot area. If anything fails partway
    /// the already-created kernel objects are removed again.
    pub fn create_and_init(
        name: &str,
        slot_count: u32,
        slot_size: u32,
    ) -> Result<Self, RingError> {
        if slot_count == 0 {
            return Err(RingError::ZeroSlots);
        }

        let sem_names = names::semaphore_names(name);
        let total = layout::region_size(slot_count, slot_size);
        let mut map = region::create(name, total)?;

        let free = Semaphore::create_exclusive(&sem_names.free, slot_count).map_err(|e| {
            let _ = region::unlink(name);
            e
        })?;
        let filled = Semaphore::create_exclusive(&sem_names.filled, 0).map_err(|e| {
            let _ = Semaphore::unlink(&sem_names.free);
            let _ = region::unlink(name);
            e
        })?;
        let mutex = Semaphore::create_exclusive(&sem_names.mutex, 1).map_err(|e| {
            let _ = Semaphore::unlink(&sem_names.free);
            let _ = Semaphore::unlink(&sem_names.filled);
            let _ = region::unlink(name);
            e
        })?;

        {
            let hdr = unsafe { &mut *(map.as_mut_ptr() as *mut RingHeader) };
            hdr.magic = RING_MAGIC;
            hdr.version = LAYOUT_VERSION;
            hdr.slot_count = slot_count;
            hdr.slot_size = slot_size;
            hdr.head = AtomicU32::new(0);
            hdr.tail = AtomicU32::new(0);
        }
        map[RingHeader::SIZE..].fill(0);

        tracing::debug!(ring = name, slot_count, slot_size, "ring created");

        Ok(Self {
            name: name.to_string(),
            map,
            slot_count,
            slot_size,
            owner: true,
            free,
            filled,
            mutex,
            sem_names,
        })
    }

    /// Attach to a ring some other process created.
    ///
    /// The region's header is authoritative: geometry is adopted from it, so
    /// callers need nothing beyond the name. If the owner has mapped the
    /// region but not yet created the semaphores, the semaphore opens are
    /// retried on a bounded backoff before giving up with an attach failure.
    pub fn open_existing(name: &str) -> Result<Self, RingError> {
        let sem_names = names::semaphore_names(name);
        let map = region::open(name)?;

        let hdr = unsafe { &*(map.as_ptr() as *const RingHeader) };
        if hdr.magic != RING_MAGIC {
            return Err(RingError::BadMagic {
                name: name.to_string(),
                found: hdr.magic,
            });
        }
        let slot_count = hdr.slot_count;
        let slot_size = hdr.slot_size;

        let required = layout::region_size(slot_count, slot_size) as u64;
        if (map.len() as u64) < required {
            return Err(RingError::RegionTooSmall {
                name: name.to_string(),
                actual: map.len() as u64,
                required,
            });
        }

        let mut attempt = 0;
        let (free, filled, mutex) = loop {
            match (
                Semaphore::open(&sem_names.free),
                Semaphore::open(&sem_names.filled),
                Semaphore::open(&sem_names.mutex),
            ) {
                (Ok(free), Ok(filled), Ok(mutex)) => break (free, filled, mutex),
                _ => {
                    attempt += 1;
                    if attempt >= ATTACH_ATTEMPTS {
                        return Err(RingError::AttachFailed {
                            name: name.to_string(),
                            attempts: attempt,
                        });
                    }
                    tracing::debug!(ring = name, attempt, "semaphores not ready, retrying");
                    thread::sleep(ATTACH_RETRY_DELAY);
                }
            }
        };

        Ok(Self {
            name: name.to_string(),
            map,
            slot_count,
            slot_size,
            owner: false,
            free,
            filled,
            mutex,
            sem_names,
        })
    }

    /// Attach to a ring whose owner may not have created it yet.
    ///
    /// A consumer usually learns a ring's name the moment its producer
    /// registers, which can be before the producer has finished (or even
    /// started) creating the kernel objects. Attempts that fail only
    /// because the region name does not exist yet are retried on the same
    /// bounded window as the semaphore opens; every other failure (bad
    /// magic, truncated region, permissions, missing semaphores) is final
    /// immediately.
    pub fn open_when_ready(name: &str) -> Result<Self, RingError> {
        let mut attempt = 0;
        loop {
            let result = Self::open_existing(name);
            match &result {
                Err(RingError::RegionOpen { source, .. })
                    if source.kind() == io::ErrorKind::NotFound
                        && attempt + 1 < ATTACH_ATTEMPTS =>
                {
                    attempt += 1;
                    tracing::debug!(ring = name, attempt, "region not created yet, retrying");
                    thread::sleep(ATTACH_RETRY_DELAY);
                }
                _ => return result,
            }
        }
    }

    /// Write one message into the next free slot, blocking while the ring is
    /// full.
    ///
    /// Fails with [`RingError::PayloadTooLarge`] before touching any
    /// semaphore if `data` does not fit a slot. A mutex failure after the
    /// free token was taken surfaces as a semaphore error without returning
    /// the token, so that rare path costs one slot of capacity.
    pub fn write_message(&mut self, data: &[u8]) -> Result<(), RingError> {
        if data.len() > self.slot_size as usize {
            return Err(RingError::PayloadTooLarge {
                len: data.len(),
                slot_size: self.slot_size,
            });
        }

        self.free.wait()?;
        self.mutex.wait()?;

        let idx = self.header().tail.load(Ordering::Acquire);
        let offset = layout::slot_offset(idx, self.slot_size);
        let payload_at = offset + LEN_PREFIX_SIZE;
        self.map[offset..payload_at].copy_from_slice(&(data.len() as u32).to_ne_bytes());
        self.map[payload_at..payload_at + data.len()].copy_from_slice(data);
        self.header()
            .tail
            .store((idx + 1) % self.slot_count, Ordering::Release);

        self.mutex.post()?;
        self.filled.post()?;
        Ok(())
    }

    /// Read the oldest message into `out`, blocking while the ring is empty.
    ///
    /// `out` is resized to the message length; zero-length messages leave it
    /// empty. Each successful call delivers exactly one message, in the
    /// order the producer wrote them.
    pub fn read_message(&mut self, out: &mut Vec<u8>) -> Result<(), RingError> {
        self.filled.wait()?;
        self.mutex.wait()?;

        let idx = self.header().head.load(Ordering::Acquire);
        let offset = layout::slot_offset(idx, self.slot_size);
        let payload_at = offset + LEN_PREFIX_SIZE;
        let mut len_bytes = [0u8; LEN_PREFIX_SIZE];
        len_bytes.copy_from_slice(&self.map[offset..payload_at]);
        let len = u32::from_ne_bytes(len_bytes) as usize;
        out.resize(len, 0);
        out.copy_from_slice(&self.map[payload_at..payload_at + len]);
        self.header()
            .head
            .store((idx + 1) % self.slot_count, Ordering::Release);

        self.mutex.post()?;
        self.free.post()?;
        Ok(())
    }

    /// Remove the region and the three semaphores from the kernel namespace.
    ///
    /// A no-op unless this handle created them. Failures are logged and
    /// swallowed: teardown keeps going so one missing name cannot strand the
    /// others.
    pub fn unlink_resources(&self) {
        if !self.owner {
            return;
        }
        for name in [
            &self.sem_names.free,
            &self.sem_names.filled,
            &self.sem_names.mutex,
        ] {
            if let Err(e) = Semaphore::unlink(name) {
                tracing::warn!(semaphore = %name, "failed to unlink: {e}");
            }
        }
        if let Err(e) = region::unlink(&self.name) {
            tracing::warn!(ring = %self.name, "failed to unlink region: {e}");
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    pub fn slot_size(&self) -> u32 {
        self.slot_size
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Number of slots a writer could fill right now without blocking.
    pub fn free_slots(&self) -> Result<u32, RingError> {
        Ok(self.free.value()?.max(0) as u32)
    }

    /// Number of messages waiting to be read.
    pub fn filled_slots(&self) -> Result<u32, RingError> {
        Ok(self.filled.value()?.max(0) as u32)
    }

    fn header(&self) -> &RingHeader {
        unsafe { &*(self.map.as_ptr() as *const RingHeader) }
    }
}
