//! 16-byte block moves used by the size-tiered router.
//!
//! On x86_64 these are SSE2 loads/stores (always available there). Other
//! targets move a `u128`, which the backend lowers to its widest native move.

#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::{__m128i, _mm_loadu_si128, _mm_store_si128, _mm_storeu_si128};

/// Width of one block in bytes.
pub(crate) const BLOCK: usize = 16;

#[cfg(target_arch = "x86_64")]
#[derive(Clone, Copy)]
pub(crate) struct Block(__m128i);

#[cfg(not(target_arch = "x86_64"))]
#[derive(Clone, Copy)]
pub(crate) struct Block(u128);

#[cfg(target_arch = "x86_64")]
impl Block {
    /// # Safety
    /// `p` must be readable for 16 bytes.
    #[inline(always)]
    pub(crate) unsafe fn load(p: *const u8) -> Self {
        // SAFETY: unaligned load; caller guarantees 16 readable bytes.
        Self(unsafe { _mm_loadu_si128(p.cast::<__m128i>()) })
    }

    /// # Safety
    /// `p` must be writable for 16 bytes.
    #[inline(always)]
    pub(crate) unsafe fn store(self, p: *mut u8) {
        // SAFETY: unaligned store; caller guarantees 16 writable bytes.
        unsafe { _mm_storeu_si128(p.cast::<__m128i>(), self.0) }
    }

    /// # Safety
    /// `p` must be writable for 16 bytes and 16-byte aligned.
    #[inline(always)]
    pub(crate) unsafe fn store_aligned(self, p: *mut u8) {
        // SAFETY: caller guarantees alignment and 16 writable bytes.
        unsafe { _mm_store_si128(p.cast::<__m128i>(), self.0) }
    }
}

#[cfg(not(target_arch = "x86_64"))]
impl Block {
    /// # Safety
    /// `p` must be readable for 16 bytes.
    #[inline(always)]
    pub(crate) unsafe fn load(p: *const u8) -> Self {
        // SAFETY: caller guarantees 16 readable bytes.
        Self(unsafe { core::ptr::read_unaligned(p.cast::<u128>()) })
    }

    /// # Safety
    /// `p` must be writable for 16 bytes.
    #[inline(always)]
    pub(crate) unsafe fn store(self, p: *mut u8) {
        // SAFETY: caller guarantees 16 writable bytes.
        unsafe { core::ptr::write_unaligned(p.cast::<u128>(), self.0) }
    }

    /// # Safety
    /// `p` must be writable for 16 bytes and 16-byte aligned.
    #[inline(always)]
    pub(crate) unsafe fn store_aligned(self, p: *mut u8) {
        // `u128` alignment is 8 on some targets, so keep this unaligned.
        // SAFETY: caller guarantees 16 writable bytes.
        unsafe { core::ptr::write_unaligned(p.cast::<u128>(), self.0) }
    }
}

/// Copies one block from `src` to `dest`.
///
/// # Safety
/// `src` readable and `dest` writable for 16 bytes.
#[inline(always)]
pub(crate) unsafe fn copy_block(dest: *mut u8, src: *const u8) {
    // SAFETY: forwarded to the caller.
    unsafe { Block::load(src).store(dest) }
}
