//! Copy kernel capability.

use core::fmt;

/// Signature every copy kernel implements.
///
/// The function returns `dest`. After it returns, `dest[0..n)` holds a
/// byte-exact copy of `src[0..n)` for any `n`, including zero.
///
/// # Safety
///
/// - `dest` must be valid for writes of `n` bytes and `src` for reads of `n` bytes
/// - The memory regions must not overlap
/// - The host CPU must support every instruction the kernel uses
pub type CopyFn = unsafe fn(dest: *mut u8, src: *const u8, n: usize) -> *mut u8;

/// A named copy primitive.
///
/// Invoking a kernel is a direct call through its function pointer.
#[derive(Clone, Copy)]
pub struct Kernel {
    tag: u32,
    name: &'static str,
    func: CopyFn,
}

impl Kernel {
    /// Wraps `func` with a diagnostic tag and name.
    #[must_use]
    pub const fn new(tag: u32, name: &'static str, func: CopyFn) -> Self {
        Self { tag, name, func }
    }

    /// Stable identifier used in diagnostics and by `memcpy-bench --variant`.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> u32 {
        self.tag
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the kernel.
    ///
    /// # Safety
    ///
    /// Same contract as [`CopyFn`].
    #[inline(always)]
    pub unsafe fn copy(&self, dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
        // SAFETY: forwarded to the caller.
        unsafe { (self.func)(dest, src, n) }
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
