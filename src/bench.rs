//! Multi-threaded copy workload behind the `memcpy-bench` binary.
//!
//! A buffer of `size` bytes is split into one contiguous slice per thread.
//! Each thread copies its slice back and forth (`src → dst` on even iterations,
//! `dst → src` on odd ones) in chunks whose sizes are drawn from a
//! [`Distribution`]. The source starts as `i as u8`; after the run the
//! destination must hold the same pattern.

use std::fmt;
use std::mem;
use std::thread;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::kernels::{self, SELFTUNED_TAG};
use crate::router::Router;

/// Chunk-size distribution: uniform in `[0, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Distribution {
    Uniform16,
    Uniform256,
    Uniform4096,
    Uniform65536,
    Uniform1M,
}

impl Distribution {
    /// Maps the command-line id (1..=5).
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Self::Uniform16),
            2 => Ok(Self::Uniform256),
            3 => Ok(Self::Uniform4096),
            4 => Ok(Self::Uniform65536),
            5 => Ok(Self::Uniform1M),
            other => Err(Error::InvalidArgument(format!(
                "distribution must be 1..=5, got {other}"
            ))),
        }
    }

    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Uniform16 => 1,
            Self::Uniform256 => 2,
            Self::Uniform4096 => 3,
            Self::Uniform65536 => 4,
            Self::Uniform1M => 5,
        }
    }

    /// Exclusive upper bound of a draw.
    #[must_use]
    pub const fn max(self) -> usize {
        match self {
            Self::Uniform16 => 16,
            Self::Uniform256 => 256,
            Self::Uniform4096 => 4096,
            Self::Uniform65536 => 65_536,
            Self::Uniform1M => 1_048_576,
        }
    }

    /// Next chunk size. Zero draws become one so every step makes progress.
    fn sample(self, rng: &mut SmallRng) -> usize {
        rng.gen_range(0..self.max()).max(1)
    }
}

/// What the workload copies with.
#[derive(Debug, Clone, Copy)]
pub enum Variant<'a> {
    /// One fixed kernel.
    Kernel(Kernel),
    /// The size-tiered, self-tuning router.
    SelfTuned(&'a Router),
}

impl<'a> Variant<'a> {
    /// Resolves a `--variant` tag against the host catalogue.
    pub fn resolve(tag: u32, router: &'a Router) -> Result<Self> {
        if tag == SELFTUNED_TAG {
            return Ok(Self::SelfTuned(router));
        }
        kernels::find(tag)
            .map(Self::Kernel)
            .ok_or(Error::UnknownVariant(tag))
    }

    #[must_use]
    pub fn tag(&self) -> u32 {
        match self {
            Self::Kernel(kernel) => kernel.tag(),
            Self::SelfTuned(_) => SELFTUNED_TAG,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kernel(kernel) => kernel.name(),
            Self::SelfTuned(_) => "selftuned",
        }
    }

    /// # Safety
    /// Same contract as [`CopyFn`](crate::kernel::CopyFn).
    #[inline]
    unsafe fn copy(&self, dest: *mut u8, src: *const u8, n: usize) {
        // SAFETY: forwarded to the caller.
        unsafe {
            match self {
                Self::Kernel(kernel) => {
                    kernel.copy(dest, src, n);
                }
                Self::SelfTuned(router) => {
                    router.route(dest, src, n);
                }
            }
        }
    }
}

/// Workload parameters.
#[derive(Debug, Clone, Copy)]
pub struct BenchOptions {
    pub size: usize,
    pub iterations: usize,
    pub threads: usize,
    pub distribution: Distribution,
}

impl BenchOptions {
    fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidArgument("size must be positive".to_string()));
        }
        if self.iterations == 0 {
            return Err(Error::InvalidArgument(
                "iterations must be positive".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(Error::InvalidArgument("threads must be positive".to_string()));
        }
        Ok(())
    }
}

/// Iterations for roughly 10 GB of traffic; a tenth of that for the smallest
/// chunk distribution.
#[must_use]
pub fn default_iterations(size: usize, distribution: Distribution) -> usize {
    let mut iterations = 10_000_000_000 / size.max(1);
    if distribution == Distribution::Uniform16 {
        iterations /= 10;
    }
    iterations.max(1)
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub name: &'static str,
    pub size: usize,
    pub iterations: usize,
    pub threads: usize,
    pub distribution: u8,
    pub variant: u32,
    pub elapsed_ns: u64,
}

impl BenchReport {
    /// Bytes per nanosecond, i.e. GB/s.
    #[must_use]
    pub fn throughput_gbps(&self) -> f64 {
        (self.size as f64 * self.iterations as f64) / self.elapsed_ns.max(1) as f64
    }

    /// `name size iterations threads distribution variant elapsed_ns`, tab-separated.
    #[must_use]
    pub fn to_tsv(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.name,
            self.size,
            self.iterations,
            self.threads,
            self.distribution,
            self.variant,
            self.elapsed_ns
        )
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} threads, size: {}, distribution {}, processed in {:.3} sec, {:.3} GB/sec",
            self.name,
            self.threads,
            self.size,
            self.distribution,
            self.elapsed_ns as f64 / 1e9,
            self.throughput_gbps()
        )
    }
}

/// Runs one legacy-SSE instruction so a chunk copied with AVX code pays the
/// AVX-to-SSE transition, as a caller mixing both would.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn sse_transition() {
    // SAFETY: zeroes a scratch register declared as clobbered; no memory access.
    unsafe {
        core::arch::asm!(
            "pxor xmm15, xmm15",
            out("xmm15") _,
            options(nomem, nostack, preserves_flags)
        );
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn sse_transition() {}

/// Copies `src` into `dst` in randomly sized chunks, with an SSE transition
/// after each chunk.
fn copy_in_chunks(
    variant: &Variant<'_>,
    dst: &mut [u8],
    src: &[u8],
    rng: &mut SmallRng,
    distribution: Distribution,
) {
    debug_assert_eq!(dst.len(), src.len());
    let mut offset = 0;
    while offset < dst.len() {
        let chunk = distribution.sample(rng).min(dst.len() - offset);
        // SAFETY: `offset + chunk <= len` for both slices, which cannot alias.
        unsafe {
            variant.copy(dst.as_mut_ptr().add(offset), src.as_ptr().add(offset), chunk);
        }
        sse_transition();
        offset += chunk;
    }
}

/// Runs the workload and validates the result.
pub fn run(variant: &Variant<'_>, options: &BenchOptions) -> Result<BenchReport> {
    options.validate()?;

    let size = options.size;
    let mut src: Vec<u8> = (0..size).map(|i| i as u8).collect();
    // Touch every destination page before timing starts.
    let mut dst = vec![0u8; size];

    let started = Instant::now();
    thread::scope(|scope| {
        let mut src_rest = src.as_mut_slice();
        let mut dst_rest = dst.as_mut_slice();
        let mut consumed = 0;

        for thread_num in 0..options.threads {
            let end = size * (thread_num + 1) / options.threads;
            let (src_part, src_tail) = mem::take(&mut src_rest).split_at_mut(end - consumed);
            let (dst_part, dst_tail) = mem::take(&mut dst_rest).split_at_mut(end - consumed);
            src_rest = src_tail;
            dst_rest = dst_tail;
            consumed = end;

            scope.spawn(move || {
                let mut rng = SmallRng::seed_from_u64(thread_num as u64);
                for iteration in 0..options.iterations {
                    if iteration % 2 == 0 {
                        copy_in_chunks(variant, dst_part, src_part, &mut rng, options.distribution);
                    } else {
                        copy_in_chunks(variant, src_part, dst_part, &mut rng, options.distribution);
                    }
                }
            });
        }
    });
    let elapsed = started.elapsed();

    if let Some((offset, &found)) = dst
        .iter()
        .enumerate()
        .find(|&(i, &byte)| byte != i as u8)
    {
        return Err(Error::Validation {
            offset,
            expected: offset as u8,
            found,
        });
    }

    Ok(BenchReport {
        name: variant.name(),
        size,
        iterations: options.iterations,
        threads: options.threads,
        distribution: options.distribution.id(),
        variant: variant.tag(),
        elapsed_ns: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
    })
}
