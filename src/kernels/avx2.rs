//! AVX2 kernels. Only registered when `is_x86_feature_detected!("avx2")`.

use core::arch::x86_64::*;

use super::sse2::copy_small_sse2;

// Short copies stay on the SSE path so they never pay the AVX power-up cost.
const SSE_MAX: usize = 64;

#[target_feature(enable = "avx2")]
unsafe fn copy_tail_avx2(mut d: *mut u8, mut s: *const u8, mut rem: usize) {
    // SAFETY: each step moves at most `rem` bytes.
    unsafe {
        while rem >= 32 {
            let v = _mm256_loadu_si256(s.cast::<__m256i>());
            _mm256_storeu_si256(d.cast::<__m256i>(), v);
            d = d.add(32);
            s = s.add(32);
            rem -= 32;
        }
        super::sse2::copy_tail_sse2(d, s, rem);
    }
}

#[target_feature(enable = "avx2")]
unsafe fn copy_256_avx2(d: *mut u8, s: *const u8) {
    // SAFETY: caller guarantees 256 valid bytes at `s` and `d`.
    unsafe {
        let v0 = _mm256_loadu_si256(s.cast::<__m256i>());
        let v1 = _mm256_loadu_si256(s.add(32).cast::<__m256i>());
        let v2 = _mm256_loadu_si256(s.add(64).cast::<__m256i>());
        let v3 = _mm256_loadu_si256(s.add(96).cast::<__m256i>());
        let v4 = _mm256_loadu_si256(s.add(128).cast::<__m256i>());
        let v5 = _mm256_loadu_si256(s.add(160).cast::<__m256i>());
        let v6 = _mm256_loadu_si256(s.add(192).cast::<__m256i>());
        let v7 = _mm256_loadu_si256(s.add(224).cast::<__m256i>());
        _mm256_storeu_si256(d.cast::<__m256i>(), v0);
        _mm256_storeu_si256(d.add(32).cast::<__m256i>(), v1);
        _mm256_storeu_si256(d.add(64).cast::<__m256i>(), v2);
        _mm256_storeu_si256(d.add(96).cast::<__m256i>(), v3);
        _mm256_storeu_si256(d.add(128).cast::<__m256i>(), v4);
        _mm256_storeu_si256(d.add(160).cast::<__m256i>(), v5);
        _mm256_storeu_si256(d.add(192).cast::<__m256i>(), v6);
        _mm256_storeu_si256(d.add(224).cast::<__m256i>(), v7);
    }
}

/// Branchless front/back overlap for 65-256 bytes.
#[target_feature(enable = "avx2")]
unsafe fn copy_medium_avx2(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    debug_assert!((SSE_MAX..=256).contains(&n));

    // SAFETY: `64 <= n <= 256`, so both halves lie inside `[0, n)`.
    unsafe {
        if n >= 128 {
            let v0 = _mm256_loadu_si256(src.cast::<__m256i>());
            let v1 = _mm256_loadu_si256(src.add(32).cast::<__m256i>());
            let v2 = _mm256_loadu_si256(src.add(64).cast::<__m256i>());
            let v3 = _mm256_loadu_si256(src.add(96).cast::<__m256i>());
            let v4 = _mm256_loadu_si256(src.add(n - 128).cast::<__m256i>());
            let v5 = _mm256_loadu_si256(src.add(n - 96).cast::<__m256i>());
            let v6 = _mm256_loadu_si256(src.add(n - 64).cast::<__m256i>());
            let v7 = _mm256_loadu_si256(src.add(n - 32).cast::<__m256i>());
            _mm256_storeu_si256(dest.cast::<__m256i>(), v0);
            _mm256_storeu_si256(dest.add(32).cast::<__m256i>(), v1);
            _mm256_storeu_si256(dest.add(64).cast::<__m256i>(), v2);
            _mm256_storeu_si256(dest.add(96).cast::<__m256i>(), v3);
            _mm256_storeu_si256(dest.add(n - 128).cast::<__m256i>(), v4);
            _mm256_storeu_si256(dest.add(n - 96).cast::<__m256i>(), v5);
            _mm256_storeu_si256(dest.add(n - 64).cast::<__m256i>(), v6);
            _mm256_storeu_si256(dest.add(n - 32).cast::<__m256i>(), v7);
            return dest;
        }

        let v0 = _mm256_loadu_si256(src.cast::<__m256i>());
        let v1 = _mm256_loadu_si256(src.add(32).cast::<__m256i>());
        let v2 = _mm256_loadu_si256(src.add(n - 64).cast::<__m256i>());
        let v3 = _mm256_loadu_si256(src.add(n - 32).cast::<__m256i>());
        _mm256_storeu_si256(dest.cast::<__m256i>(), v0);
        _mm256_storeu_si256(dest.add(32).cast::<__m256i>(), v1);
        _mm256_storeu_si256(dest.add(n - 64).cast::<__m256i>(), v2);
        _mm256_storeu_si256(dest.add(n - 32).cast::<__m256i>(), v3);
    }
    dest
}

/// Stores the first 32 bytes unaligned and returns how far `dest` must move
/// to reach the next 32-byte boundary (1..=32).
#[target_feature(enable = "avx2")]
unsafe fn align_prologue_avx2(dest: *mut u8, src: *const u8) -> usize {
    // SAFETY: caller guarantees at least 32 valid bytes.
    unsafe {
        let first = _mm256_loadu_si256(src.cast::<__m256i>());
        _mm256_storeu_si256(dest.cast::<__m256i>(), first);
    }
    32 - ((dest as usize) & 31)
}

/// Unaligned 256-byte loop with a stepped tail.
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
/// - AVX2 must be supported
#[target_feature(enable = "avx2")]
pub unsafe fn avx2_unaligned(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: the loop runs while 256 bytes remain; the tail moves the rest.
    unsafe {
        if n <= SSE_MAX {
            return copy_small_sse2(dest, src, n);
        }

        let mut d = dest;
        let mut s = src;
        let mut rem = n;
        while rem >= 256 {
            copy_256_avx2(d, s);
            d = d.add(256);
            s = s.add(256);
            rem -= 256;
        }
        copy_tail_avx2(d, s, rem);
    }
    dest
}

/// Destination-aligned loop, 4 × 32 bytes per iteration, overlapping
/// 128-byte tail.
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
/// - AVX2 must be supported
#[target_feature(enable = "avx2")]
pub unsafe fn avx2_forward_x4(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: `n > 256` past the early returns; the prologue advances at most
    // 32 bytes and the tail block starts at `n - 128 >= 0`.
    unsafe {
        if n <= SSE_MAX {
            return copy_small_sse2(dest, src, n);
        }
        if n <= 256 {
            return copy_medium_avx2(dest, src, n);
        }

        let advance = align_prologue_avx2(dest, src);
        let mut d = dest.add(advance);
        let mut s = src.add(advance);
        let mut rem = n - advance;

        while rem >= 128 {
            let v0 = _mm256_loadu_si256(s.cast::<__m256i>());
            let v1 = _mm256_loadu_si256(s.add(32).cast::<__m256i>());
            let v2 = _mm256_loadu_si256(s.add(64).cast::<__m256i>());
            let v3 = _mm256_loadu_si256(s.add(96).cast::<__m256i>());
            // `d` is 32-byte aligned after the prologue.
            _mm256_store_si256(d.cast::<__m256i>(), v0);
            _mm256_store_si256(d.add(32).cast::<__m256i>(), v1);
            _mm256_store_si256(d.add(64).cast::<__m256i>(), v2);
            _mm256_store_si256(d.add(96).cast::<__m256i>(), v3);
            d = d.add(128);
            s = s.add(128);
            rem -= 128;
        }

        if rem > 0 {
            let ts = src.add(n - 128);
            let td = dest.add(n - 128);
            let t0 = _mm256_loadu_si256(ts.cast::<__m256i>());
            let t1 = _mm256_loadu_si256(ts.add(32).cast::<__m256i>());
            let t2 = _mm256_loadu_si256(ts.add(64).cast::<__m256i>());
            let t3 = _mm256_loadu_si256(ts.add(96).cast::<__m256i>());
            _mm256_storeu_si256(td.cast::<__m256i>(), t0);
            _mm256_storeu_si256(td.add(32).cast::<__m256i>(), t1);
            _mm256_storeu_si256(td.add(64).cast::<__m256i>(), t2);
            _mm256_storeu_si256(td.add(96).cast::<__m256i>(), t3);
        }
    }
    dest
}

/// Destination-aligned loop, 8 × 32 bytes per iteration, finishing with the
/// last 256 bytes written unaligned over the boundary.
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
/// - AVX2 must be supported
#[target_feature(enable = "avx2")]
pub unsafe fn avx2_forward_x8(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: `n > 256` past the early returns. The loop stops with
    // 1..=256 bytes left, all covered by the final block at `n - 256`.
    unsafe {
        if n <= SSE_MAX {
            return copy_small_sse2(dest, src, n);
        }
        if n <= 256 {
            return copy_medium_avx2(dest, src, n);
        }

        let advance = align_prologue_avx2(dest, src);
        let mut d = dest.add(advance);
        let mut s = src.add(advance);
        let mut rem = n - advance;

        while rem > 256 {
            let v0 = _mm256_loadu_si256(s.cast::<__m256i>());
            let v1 = _mm256_loadu_si256(s.add(32).cast::<__m256i>());
            let v2 = _mm256_loadu_si256(s.add(64).cast::<__m256i>());
            let v3 = _mm256_loadu_si256(s.add(96).cast::<__m256i>());
            let v4 = _mm256_loadu_si256(s.add(128).cast::<__m256i>());
            let v5 = _mm256_loadu_si256(s.add(160).cast::<__m256i>());
            let v6 = _mm256_loadu_si256(s.add(192).cast::<__m256i>());
            let v7 = _mm256_loadu_si256(s.add(224).cast::<__m256i>());
            _mm256_store_si256(d.cast::<__m256i>(), v0);
            _mm256_store_si256(d.add(32).cast::<__m256i>(), v1);
            _mm256_store_si256(d.add(64).cast::<__m256i>(), v2);
            _mm256_store_si256(d.add(96).cast::<__m256i>(), v3);
            _mm256_store_si256(d.add(128).cast::<__m256i>(), v4);
            _mm256_store_si256(d.add(160).cast::<__m256i>(), v5);
            _mm256_store_si256(d.add(192).cast::<__m256i>(), v6);
            _mm256_store_si256(d.add(224).cast::<__m256i>(), v7);
            d = d.add(256);
            s = s.add(256);
            rem -= 256;
        }

        copy_256_avx2(dest.add(n - 256), src.add(n - 256));
    }
    dest
}

/// Non-temporal stores for copies that would only pollute the cache.
///
/// # Safety
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
/// - AVX2 must be supported
#[target_feature(enable = "avx2")]
pub unsafe fn avx2_stream(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: `n > 256` past the early returns, so the 32-byte prologue fits.
    unsafe {
        if n <= SSE_MAX {
            return copy_small_sse2(dest, src, n);
        }
        if n <= 256 {
            return copy_medium_avx2(dest, src, n);
        }

        let advance = align_prologue_avx2(dest, src);
        let mut d = dest.add(advance);
        let mut s = src.add(advance);
        let mut rem = n - advance;

        while rem >= 128 {
            let v0 = _mm256_loadu_si256(s.cast::<__m256i>());
            let v1 = _mm256_loadu_si256(s.add(32).cast::<__m256i>());
            let v2 = _mm256_loadu_si256(s.add(64).cast::<__m256i>());
            let v3 = _mm256_loadu_si256(s.add(96).cast::<__m256i>());
            // Streaming stores need the 32-byte alignment the prologue established.
            _mm256_stream_si256(d.cast::<__m256i>(), v0);
            _mm256_stream_si256(d.add(32).cast::<__m256i>(), v1);
            _mm256_stream_si256(d.add(64).cast::<__m256i>(), v2);
            _mm256_stream_si256(d.add(96).cast::<__m256i>(), v3);
            d = d.add(128);
            s = s.add(128);
            rem -= 128;
        }

        copy_tail_avx2(d, s, rem);

        // Streaming stores are weakly ordered; fence before the caller reads `dest`.
        _mm_sfence();
    }
    dest
}
