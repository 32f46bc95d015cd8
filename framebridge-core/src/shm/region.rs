//! SharedMemoryRegion - POSIX shared memory wrapper.
//!
//! Provides safe abstraction over mmap and shm_open for the bridge segment.
//! All unsafe operations are encapsulated here.

use std::ffi::CString;
use std::ptr::NonNull;

use crate::error::SharedMemoryError;
use crate::types::SegmentId;

/// Represents a mapped shared memory region.
///
/// This struct owns the mapping and will unmap it on drop.
/// The memory can be shared between processes using the same segment id.
pub struct SharedMemoryRegion {
    /// Segment the region belongs to.
    id: SegmentId,
    /// Pointer to the mapped memory.
    ptr: NonNull<u8>,
    /// Size of the mapped region in bytes.
    size: usize,
    /// File descriptor for the shared memory object.
    fd: i32,
    /// Whether this instance created the SHM (and should unlink on drop).
    is_owner: bool,
}

// SAFETY: SharedMemoryRegion owns its mapping; it can move between threads.
unsafe impl Send for SharedMemoryRegion {}

// SAFETY: the region only hands out raw pointers; every typed view over it
// consists of atomics.
unsafe impl Sync for SharedMemoryRegion {}

impl SharedMemoryRegion {
    /// Attach the segment, creating and zero-filling it when it does not exist.
    ///
    /// An existing object must already have exactly `size` bytes; a mismatch
    /// means the other side was built with a different layout.
    pub fn open_or_create(id: SegmentId, size: usize) -> Result<Self, SharedMemoryError> {
        let attach_failed = |reason: String| SharedMemoryError::AttachFailed { id, reason };

        if size == 0 {
            return Err(attach_failed("size cannot be zero".to_string()));
        }

        let c_name = CString::new(id.shm_name())
            .map_err(|e| attach_failed(format!("Invalid name: {}", e)))?;

        // Try exclusive create first so we know whether we own the object.
        // SAFETY: c_name is a valid CString, flags are valid POSIX flags
        let mut fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                0o600,
            )
        };
        let mut is_owner = true;

        if fd < 0 {
            let errno = std::io::Error::last_os_error();
            if errno.raw_os_error() != Some(libc::EEXIST) {
                return Err(attach_failed(format!("shm_open failed: {}", errno)));
            }

            // SAFETY: c_name is a valid CString
            fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
            if fd < 0 {
                return Err(attach_failed(format!(
                    "shm_open failed: {}",
                    std::io::Error::last_os_error()
                )));
            }
            is_owner = false;
        }

        if is_owner {
            // SAFETY: fd is a valid file descriptor
            let result = unsafe { libc::ftruncate(fd, size as libc::off_t) };
            if result < 0 {
                let errno = std::io::Error::last_os_error();
                unsafe { libc::close(fd) };
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                return Err(attach_failed(format!("ftruncate failed: {}", errno)));
            }
        } else {
            let actual = Self::object_size(fd).map_err(|e| {
                unsafe { libc::close(fd) };
                attach_failed(format!("fstat failed: {}", e))
            })?;
            if actual != size {
                unsafe { libc::close(fd) };
                return Err(SharedMemoryError::SizeMismatch {
                    id,
                    expected: size,
                    actual,
                });
            }
        }

        // SAFETY: fd is valid, size is validated, offset 0 is valid
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            let errno = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            if is_owner {
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
            }
            return Err(SharedMemoryError::MapFailed {
                reason: format!("mmap failed: {}", errno),
            });
        }

        if is_owner {
            // SAFETY: ptr is valid for size bytes and nobody else has seen it yet
            unsafe {
                std::ptr::write_bytes(ptr as *mut u8, 0, size);
            }
        }

        let Some(ptr) = NonNull::new(ptr as *mut u8) else {
            unsafe { libc::close(fd) };
            return Err(SharedMemoryError::MapFailed {
                reason: "mmap returned null".to_string(),
            });
        };

        tracing::debug!(id = %id, size = size, created = is_owner, "Attached shared memory segment");

        Ok(Self {
            id,
            ptr,
            size,
            fd,
            is_owner,
        })
    }

    fn object_size(fd: i32) -> std::io::Result<usize> {
        let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
        // SAFETY: fd is valid and stat points to writable storage
        let result = unsafe { libc::fstat(fd, stat.as_mut_ptr()) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
        // SAFETY: fstat succeeded and initialised the struct
        Ok(unsafe { stat.assume_init() }.st_size as usize)
    }

    /// Get the segment id of this region.
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Get the size of this shared memory region.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this process created the segment.
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Get a raw pointer to the shared memory.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for SharedMemoryRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and size were set during attach
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size) };
        if result < 0 {
            tracing::error!(
                id = %self.id,
                error = %std::io::Error::last_os_error(),
                "Failed to unmap shared memory"
            );
        }

        // SAFETY: fd was opened during attach
        unsafe { libc::close(self.fd) };

        if self.is_owner {
            if let Ok(c_name) = CString::new(self.id.shm_name()) {
                // SAFETY: c_name is a valid CString
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                tracing::debug!(id = %self.id, "Unlinked shared memory segment");
            }
        }
    }
}
