//! POSIX shared memory plumbing: create/open a named region and map it.

use crate::errors::RingError;
use crate::layout::RingHeader;
use memmap2::{MmapMut, MmapOptions};
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use std::fs::File;
use std::io;

fn open_error(name: &str, errno: nix::errno::Errno) -> RingError {
    RingError::RegionOpen {
        name: name.to_string(),
        source: io::Error::from_raw_os_error(errno as i32),
    }
}

fn io_error(name: &str, source: io::Error) -> RingError {
    RingError::RegionOpen {
        name: name.to_string(),
        source,
    }
}

/// Create a new region of exactly `total` bytes and map it read/write.
/// Fails if the name already exists. A failure after the name was claimed
/// removes it again so a half-built region is not left behind.
pub(crate) fn create(name: &str, total: usize) -> Result<MmapMut, RingError> {
    let fd = shm_open(
        name,
        OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
        Mode::from_bits_truncate(0o666),
    )
    .map_err(|e| open_error(name, e))?;

    let file = File::from(fd);
    file.set_len(total as u64).map_err(|e| {
        let _ = shm_unlink(name);
        io_error(name, e)
    })?;

    let map = unsafe { MmapOptions::new().map_mut(&file) }.map_err(|e| {
        let _ = shm_unlink(name);
        io_error(name, e)
    })?;

    Ok(map)
}

/// Open an existing region and map its full current size read/write.
/// The region must hold at least a header; geometry validation against the
/// header contents is the caller's job.
pub(crate) fn open(name: &str) -> Result<MmapMut, RingError> {
    let fd = shm_open(name, OFlag::O_RDWR, Mode::empty()).map_err(|e| open_error(name, e))?;

    let file = File::from(fd);
    let actual = file.metadata().map_err(|e| io_error(name, e))?.len();
    if actual < RingHeader::SIZE as u64 {
        return Err(RingError::RegionTooSmall {
            name: name.to_string(),
            actual,
            required: RingHeader::SIZE as u64,
        });
    }

    let map = unsafe { MmapOptions::new().map_mut(&file) }.map_err(|e| io_error(name, e))?;
    Ok(map)
}

/// Remove `name` from the kernel namespace. Existing mappings stay valid.
pub(crate) fn unlink(name: &str) -> Result<(), RingError> {
    shm_unlink(name).map_err(|e| open_error(name, e))
}
