//! Target-independent kernels.

use core::ptr;

/// Copies up to 16 bytes with two possibly-overlapping moves.
///
/// Both moves write the same bytes where they overlap, so the overlap is
/// harmless.
///
/// # Safety
///
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
/// - `n <= 16`
#[inline(always)]
pub unsafe fn copy_tiny(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    debug_assert!(n <= 16);

    // SAFETY: every access stays in `[0, n)` because each pair is only taken
    // when `n` is at least the move width.
    unsafe {
        if n >= 8 {
            let a = ptr::read_unaligned(src.cast::<u64>());
            let b = ptr::read_unaligned(src.add(n - 8).cast::<u64>());
            ptr::write_unaligned(dest.add(n - 8).cast::<u64>(), b);
            ptr::write_unaligned(dest.cast::<u64>(), a);
        } else if n >= 4 {
            let a = ptr::read_unaligned(src.cast::<u32>());
            let b = ptr::read_unaligned(src.add(n - 4).cast::<u32>());
            ptr::write_unaligned(dest.add(n - 4).cast::<u32>(), b);
            ptr::write_unaligned(dest.cast::<u32>(), a);
        } else if n >= 2 {
            let a = ptr::read_unaligned(src.cast::<u16>());
            let b = ptr::read_unaligned(src.add(n - 2).cast::<u16>());
            ptr::write_unaligned(dest.add(n - 2).cast::<u16>(), b);
            ptr::write_unaligned(dest.cast::<u16>(), a);
        } else if n == 1 {
            *dest = *src;
        }
    }

    dest
}

/// Standard library copy. Baseline kernel.
///
/// # Safety
///
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
pub unsafe fn std_copy(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded to the caller.
    unsafe { ptr::copy_nonoverlapping(src, dest, n) };
    dest
}

/// One byte per iteration.
///
/// # Safety
///
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
pub unsafe fn bytewise(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    for i in 0..n {
        // SAFETY: `i < n`.
        unsafe { *dest.add(i) = *src.add(i) };
    }
    dest
}

/// Unaligned 8-byte words, then one overlapping word for the remainder.
///
/// # Safety
///
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
pub unsafe fn words(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    if n < 8 {
        // SAFETY: forwarded to the caller; `n < 8 <= 16`.
        return unsafe { copy_tiny(dest, src, n) };
    }

    let mut offset = 0usize;
    // SAFETY: `offset + 8 <= n` inside the loop, and the final word ends at `n`.
    unsafe {
        while offset + 8 <= n {
            let w = ptr::read_unaligned(src.add(offset).cast::<u64>());
            ptr::write_unaligned(dest.add(offset).cast::<u64>(), w);
            offset += 8;
        }
        if offset < n {
            let w = ptr::read_unaligned(src.add(n - 8).cast::<u64>());
            ptr::write_unaligned(dest.add(n - 8).cast::<u64>(), w);
        }
    }
    dest
}
