//! SSE2 kernels. SSE2 is part of the x86_64 baseline, so none of these need
//! runtime detection.

use core::arch::asm;
use core::arch::x86_64::*;

use super::portable::copy_tiny;

/// Copies `rem` bytes front to back in 16-byte steps, finishing with a tiny
/// overlapping copy. Never touches bytes outside `[0, rem)`.
///
/// # Safety
/// - `d`/`s` valid for `rem` bytes, non-overlapping
#[inline(always)]
pub(crate) unsafe fn copy_tail_sse2(mut d: *mut u8, mut s: *const u8, mut rem: usize) {
    // SAFETY: each step moves at most `rem` bytes.
    unsafe {
        while rem >= 16 {
            let v = _mm_loadu_si128(s.cast::<__m128i>());
            _mm_storeu_si128(d.cast::<__m128i>(), v);
            d = d.add(16);
            s = s.add(16);
            rem -= 16;
        }
        copy_tiny(d, s, rem);
    }
}

/// Branchless overlapping copy for 0-64 bytes.
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
/// - `n <= 64`
#[inline(always)]
pub(crate) unsafe fn copy_small_sse2(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    debug_assert!(n <= 64);

    // SAFETY: the front and back windows are both inside `[0, n)` for each
    // size class; all loads happen before stores.
    unsafe {
        if n >= 32 {
            let v0 = _mm_loadu_si128(src.cast::<__m128i>());
            let v1 = _mm_loadu_si128(src.add(16).cast::<__m128i>());
            let v2 = _mm_loadu_si128(src.add(n - 32).cast::<__m128i>());
            let v3 = _mm_loadu_si128(src.add(n - 16).cast::<__m128i>());
            _mm_storeu_si128(dest.cast::<__m128i>(), v0);
            _mm_storeu_si128(dest.add(16).cast::<__m128i>(), v1);
            _mm_storeu_si128(dest.add(n - 32).cast::<__m128i>(), v2);
            _mm_storeu_si128(dest.add(n - 16).cast::<__m128i>(), v3);
            return dest;
        }

        if n >= 16 {
            let v0 = _mm_loadu_si128(src.cast::<__m128i>());
            let v1 = _mm_loadu_si128(src.add(n - 16).cast::<__m128i>());
            _mm_storeu_si128(dest.cast::<__m128i>(), v0);
            _mm_storeu_si128(dest.add(n - 16).cast::<__m128i>(), v1);
            return dest;
        }

        copy_tiny(dest, src, n)
    }
}

/// `rep movsb` (fast on CPUs advertising ERMS).
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
pub unsafe fn erms(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: the direction flag is clear per the SysV ABI, so `rep movsb`
    // copies exactly `n` bytes forward from `src` to `dest`.
    unsafe {
        asm!(
            "rep movsb",
            inout("rdi") dest => _,
            inout("rsi") src => _,
            inout("rcx") n => _,
            options(nostack, preserves_flags)
        );
    }
    dest
}

/// Destination-aligned loop moving `BLOCKS` × 16 bytes per iteration.
///
/// Instantiated with 1, 2, 4 and 8 blocks.
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
pub unsafe fn sse2_unrolled<const BLOCKS: usize>(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    let stride = 16 * BLOCKS;

    // SAFETY: short copies take the stepped tail. Otherwise `n > 16`, so the
    // unaligned head block is in bounds, and the padding (< 16) is at most `n`.
    unsafe {
        if n <= stride {
            copy_tail_sse2(dest, src, n);
            return dest;
        }

        let mut d = dest;
        let mut s = src;
        let mut rem = n;

        let padding = (16 - ((d as usize) & 15)) & 15;
        if padding > 0 {
            let head = _mm_loadu_si128(s.cast::<__m128i>());
            _mm_storeu_si128(d.cast::<__m128i>(), head);
            d = d.add(padding);
            s = s.add(padding);
            rem -= padding;
        }

        while rem >= stride {
            let mut regs = [_mm_setzero_si128(); BLOCKS];
            for (i, reg) in regs.iter_mut().enumerate() {
                *reg = _mm_loadu_si128(s.add(16 * i).cast::<__m128i>());
            }
            // `d` is 16-byte aligned after the prologue and moves by multiples of 16.
            for (i, reg) in regs.iter().enumerate() {
                _mm_store_si128(d.add(16 * i).cast::<__m128i>(), *reg);
            }
            d = d.add(stride);
            s = s.add(stride);
            rem -= stride;
        }

        copy_tail_sse2(d, s, rem);
    }
    dest
}

/// Overlapping small path, then an unaligned 64-byte loop whose last
/// iteration is replaced by one 64-byte block ending exactly at `n`.
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
pub unsafe fn sse2_overlap(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: for `n > 64` every block starts at or before `n - 64`.
    unsafe {
        if n <= 64 {
            return copy_small_sse2(dest, src, n);
        }

        let mut offset = 0usize;
        while n - offset > 64 {
            let v0 = _mm_loadu_si128(src.add(offset).cast::<__m128i>());
            let v1 = _mm_loadu_si128(src.add(offset + 16).cast::<__m128i>());
            let v2 = _mm_loadu_si128(src.add(offset + 32).cast::<__m128i>());
            let v3 = _mm_loadu_si128(src.add(offset + 48).cast::<__m128i>());
            _mm_storeu_si128(dest.add(offset).cast::<__m128i>(), v0);
            _mm_storeu_si128(dest.add(offset + 16).cast::<__m128i>(), v1);
            _mm_storeu_si128(dest.add(offset + 32).cast::<__m128i>(), v2);
            _mm_storeu_si128(dest.add(offset + 48).cast::<__m128i>(), v3);
            offset += 64;
        }

        copy_small_sse2(dest.add(n - 64), src.add(n - 64), 64);
    }
    dest
}

/// Loads the head and the last 64 bytes up front, runs a 64-byte loop with
/// aligned stores, then writes the saved blocks over both ends.
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
pub unsafe fn sse2_forward(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: `n > 64`, so the head, the four tail blocks and the advance of
    // 1..=16 bytes are all within `[0, n)`.
    unsafe {
        if n <= 64 {
            return copy_small_sse2(dest, src, n);
        }

        let head = _mm_loadu_si128(src.cast::<__m128i>());
        let t0 = _mm_loadu_si128(src.add(n - 64).cast::<__m128i>());
        let t1 = _mm_loadu_si128(src.add(n - 48).cast::<__m128i>());
        let t2 = _mm_loadu_si128(src.add(n - 32).cast::<__m128i>());
        let t3 = _mm_loadu_si128(src.add(n - 16).cast::<__m128i>());

        let advance = 16 - ((dest as usize) & 15);
        let mut d = dest.add(advance);
        let mut s = src.add(advance);
        let mut rem = n - advance;

        // The saved tail covers whatever the loop leaves behind (at most 64 bytes).
        while rem > 64 {
            let v0 = _mm_loadu_si128(s.cast::<__m128i>());
            let v1 = _mm_loadu_si128(s.add(16).cast::<__m128i>());
            let v2 = _mm_loadu_si128(s.add(32).cast::<__m128i>());
            let v3 = _mm_loadu_si128(s.add(48).cast::<__m128i>());
            _mm_store_si128(d.cast::<__m128i>(), v0);
            _mm_store_si128(d.add(16).cast::<__m128i>(), v1);
            _mm_store_si128(d.add(32).cast::<__m128i>(), v2);
            _mm_store_si128(d.add(48).cast::<__m128i>(), v3);
            d = d.add(64);
            s = s.add(64);
            rem -= 64;
        }

        _mm_storeu_si128(dest.add(n - 64).cast::<__m128i>(), t0);
        _mm_storeu_si128(dest.add(n - 48).cast::<__m128i>(), t1);
        _mm_storeu_si128(dest.add(n - 32).cast::<__m128i>(), t2);
        _mm_storeu_si128(dest.add(n - 16).cast::<__m128i>(), t3);
        _mm_storeu_si128(dest.cast::<__m128i>(), head);
    }
    dest
}
