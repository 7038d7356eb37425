use nix::libc;
use std::ffi::CString;
use std::os::raw::c_int;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SemaphoreError {
    #[error("semaphore operation failed: {0}")]
    Os(#[from] nix::errno::Errno),
    #[error("invalid semaphore name")]
    InvalidName,
}

/// A POSIX named semaphore handle.
///
/// Dropping the handle closes it; the name stays in the kernel namespace
/// until someone calls [`Semaphore::unlink`].
pub struct Semaphore {
    sem: *mut libc::sem_t,
}

impl Semaphore {
    /// Create a new named semaphore with `initial` tokens. Fails with EEXIST
    /// if the name is already taken.
    pub fn create_exclusive(name: &str, initial: u32) -> Result<Self, SemaphoreError> {
        let c_name = CString::new(name).map_err(|_| SemaphoreError::InvalidName)?;

        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o666,
                initial as libc::c_uint,
            )
        };

        if sem == libc::SEM_FAILED {
            return Err(SemaphoreError::Os(nix::errno::Errno::last()));
        }

        Ok(Self { sem })
    }

    /// Open an existing named semaphore. Fails with ENOENT if nobody has
    /// created it yet.
    pub fn open(name: &str) -> Result<Self, SemaphoreError> {
        let c_name = CString::new(name).map_err(|_| SemaphoreError::InvalidName)?;

        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };

        if sem == libc::SEM_FAILED {
            return Err(SemaphoreError::Os(nix::errno::Errno::last()));
        }

        Ok(Self { sem })
    }

    /// Take one token, blocking until one is available.
    ///
    /// Waits interrupted by signal delivery are restarted transparently so a
    /// short signal cannot corrupt a caller's slot protocol mid-operation.
    pub fn wait(&self) -> Result<(), SemaphoreError> {
        loop {
            if unsafe { libc::sem_wait(self.sem) } == 0 {
                return Ok(());
            }
            let errno = nix::errno::Errno::last();
            if errno != nix::errno::Errno::EINTR {
                return Err(SemaphoreError::Os(errno));
            }
        }
    }

    /// Release one token.
    pub fn post(&self) -> Result<(), SemaphoreError> {
        let ret = unsafe { libc::sem_post(self.sem) };
        if ret != 0 {
            return Err(SemaphoreError::Os(nix::errno::Errno::last()));
        }
        Ok(())
    }

    /// Current token count.
    pub fn value(&self) -> Result<i32, SemaphoreError> {
        let mut val: c_int = 0;
        let ret = unsafe { libc::sem_getvalue(self.sem, &mut val) };
        if ret != 0 {
            return Err(SemaphoreError::Os(nix::errno::Errno::last()));
        }
        Ok(val)
    }

    /// Remove `name` from the kernel namespace. Open handles stay usable;
    /// new opens fail with ENOENT.
    pub fn unlink(name: &str) -> Result<(), SemaphoreError> {
        let c_name = CString::new(name).map_err(|_| SemaphoreError::InvalidName)?;
        let ret = unsafe { libc::sem_unlink(c_name.as_ptr()) };
        if ret != 0 {
            return Err(SemaphoreError::Os(nix::errno::Errno::last()));
        }
        Ok(())
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem);
        }
    }
}

unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}
