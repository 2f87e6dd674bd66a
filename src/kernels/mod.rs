//! Host copy kernel catalogue.
//!
//! Every kernel honours the [`CopyFn`](crate::kernel::CopyFn) contract for any
//! length; kernels with a minimum efficient size fall back to an overlapping
//! small-copy path below it.
//!
//! Tags follow the memcpy-bench variant numbering:
//!
//! | tag | kernel |
//! |-----|--------|
//! | 1   | `std` (`ptr::copy_nonoverlapping`, baseline) |
//! | 2   | `bytewise` |
//! | 3   | `words` |
//! | 4   | `erms` (`rep movsb`) |
//! | 6-9 | `sse2`, `sse2_x2`, `sse2_x4`, `sse2_x8` |
//! | 10  | `sse2_overlap` |
//! | 11  | `avx2_unaligned` |
//! | 31  | `avx2_forward_x8` |
//! | 32  | `sse2_forward` |
//! | 33  | `avx2_forward_x4` |
//! | 34  | `avx2_stream` |

#![allow(unsafe_code)]

#[cfg(target_arch = "x86_64")]
pub mod avx2;
pub(crate) mod block;
pub mod portable;
#[cfg(target_arch = "x86_64")]
pub mod sse2;

use crate::kernel::Kernel;

/// Baseline kernel, always first in [`host_kernels`].
pub const STD: Kernel = Kernel::new(1, "std", portable::std_copy);

/// Tag `memcpy-bench` uses for the self-tuning router rather than a kernel.
pub const SELFTUNED_TAG: u32 = 30;

/// Kernels the current CPU can run, baseline first.
#[must_use]
pub fn host_kernels() -> Vec<Kernel> {
    let mut kernels = vec![
        STD,
        Kernel::new(2, "bytewise", portable::bytewise),
        Kernel::new(3, "words", portable::words),
    ];

    #[cfg(target_arch = "x86_64")]
    {
        kernels.extend([
            Kernel::new(4, "erms", sse2::erms),
            Kernel::new(6, "sse2", sse2::sse2_unrolled::<1>),
            Kernel::new(7, "sse2_x2", sse2::sse2_unrolled::<2>),
            Kernel::new(8, "sse2_x4", sse2::sse2_unrolled::<4>),
            Kernel::new(9, "sse2_x8", sse2::sse2_unrolled::<8>),
            Kernel::new(10, "sse2_overlap", sse2::sse2_overlap),
            Kernel::new(32, "sse2_forward", sse2::sse2_forward),
        ]);

        if is_x86_feature_detected!("avx2") {
            kernels.extend([
                Kernel::new(11, "avx2_unaligned", avx2::avx2_unaligned),
                Kernel::new(31, "avx2_forward_x8", avx2::avx2_forward_x8),
                Kernel::new(33, "avx2_forward_x4", avx2::avx2_forward_x4),
                Kernel::new(34, "avx2_stream", avx2::avx2_stream),
            ]);
        }
    }

    kernels
}

/// Looks up a host kernel by tag.
#[must_use]
pub fn find(tag: u32) -> Option<Kernel> {
    host_kernels().into_iter().find(|k| k.tag() == tag)
}
