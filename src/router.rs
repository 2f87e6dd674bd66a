//! Size-tiered front end.
//!
//! # Bands
//!
//! - 0-16 bytes: two overlapping scalar moves (head and tail)
//! - 17-128 bytes: last 16-byte block first, then 16-byte blocks from the front
//! - 129 bytes up to `large_threshold`: unaligned head block, destination-aligned
//!   128-byte loop (8 × 16 unrolled), then the 17-128 finish
//! - `large_threshold` and above: the adaptive [`Dispatcher`]
//!
//! Every band writes some bytes twice at block boundaries. Both writes carry the
//! same source bytes, so the result is unaffected.

use std::sync::OnceLock;

use tracing::{info, warn};

use crate::config::{SMALL_BAND_MAX, TuningConfig};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::kernels::block::{BLOCK, Block, copy_block};
use crate::kernels::portable::copy_tiny;
use crate::registry::Registry;
use crate::timing::{CycleClock, Tsc};

/// Size class a copy length falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// `n <= 16`
    Tiny,
    /// `16 < n <= 128`
    Small,
    /// `128 < n < large_threshold`
    Medium,
    /// `n >= large_threshold`
    Large,
}

/// Copies `n` bytes (17 or more in the small band) as: the block ending at `n`,
/// then blocks from the front while more than one block remains.
///
/// When called from the medium band `n` may be below 16; the first store then
/// starts before `d`, inside bytes the caller has already copied.
#[inline(always)]
unsafe fn copy_stride(mut d: *mut u8, mut s: *const u8, mut n: usize) {
    // SAFETY: see above; every forward block lies inside `[d, d + n)`.
    unsafe {
        copy_block(d.add(n).sub(BLOCK), s.add(n).sub(BLOCK));
        while n > BLOCK {
            copy_block(d, s);
            d = d.add(BLOCK);
            s = s.add(BLOCK);
            n -= BLOCK;
        }
    }
}

#[inline(always)]
unsafe fn copy_medium(dest: *mut u8, src: *const u8, n: usize) {
    const CHUNK: usize = 8 * BLOCK;

    let mut d = dest;
    let mut s = src;
    let mut rem = n;

    // SAFETY: `n > 128`. The head block and padding (< 16) fit; the loop moves
    // whole chunks while `rem >= 128`. If the loop ran, at least 128 bytes
    // precede `d`, which covers the backwards reach of `copy_stride`.
    unsafe {
        let padding = (BLOCK - ((d as usize) & (BLOCK - 1))) & (BLOCK - 1);
        if padding > 0 {
            copy_block(d, s);
            d = d.add(padding);
            s = s.add(padding);
            rem -= padding;
        }

        while rem >= CHUNK {
            let c0 = Block::load(s);
            let c1 = Block::load(s.add(BLOCK));
            let c2 = Block::load(s.add(2 * BLOCK));
            let c3 = Block::load(s.add(3 * BLOCK));
            let c4 = Block::load(s.add(4 * BLOCK));
            let c5 = Block::load(s.add(5 * BLOCK));
            let c6 = Block::load(s.add(6 * BLOCK));
            let c7 = Block::load(s.add(7 * BLOCK));
            c0.store_aligned(d);
            c1.store_aligned(d.add(BLOCK));
            c2.store_aligned(d.add(2 * BLOCK));
            c3.store_aligned(d.add(3 * BLOCK));
            c4.store_aligned(d.add(4 * BLOCK));
            c5.store_aligned(d.add(5 * BLOCK));
            c6.store_aligned(d.add(6 * BLOCK));
            c7.store_aligned(d.add(7 * BLOCK));
            d = d.add(CHUNK);
            s = s.add(CHUNK);
            rem -= CHUNK;
        }

        copy_stride(d, s, rem);
    }
}

/// Size-tiered copy front end over an adaptive [`Dispatcher`].
#[derive(Debug)]
pub struct Router<C: CycleClock = Tsc> {
    dispatcher: Dispatcher<C>,
    large_threshold: usize,
}

impl Router<Tsc> {
    /// Router over the host kernel catalogue.
    pub fn host(config: TuningConfig) -> Result<Self> {
        Ok(Self::new(Dispatcher::new(Registry::host(), config)?))
    }
}

impl<C: CycleClock> Router<C> {
    /// Routes lengths of at least `dispatcher.config().large_threshold` to
    /// `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        let large_threshold = dispatcher.config().large_threshold;
        Self {
            dispatcher,
            large_threshold,
        }
    }

    #[inline]
    #[must_use]
    pub fn band(&self, n: usize) -> Band {
        if n <= BLOCK {
            Band::Tiny
        } else if n <= SMALL_BAND_MAX {
            Band::Small
        } else if n < self.large_threshold {
            Band::Medium
        } else {
            Band::Large
        }
    }

    /// Copies `n` bytes from `src` to `dest` and returns `dest`.
    ///
    /// # Safety
    ///
    /// - `dest` and `src` must be valid for reads/writes of `n` bytes
    /// - The memory regions must not overlap
    #[inline]
    pub unsafe fn route(&self, dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
        // SAFETY: forwarded to the caller; each band stays within `n` bytes.
        unsafe {
            match self.band(n) {
                Band::Tiny => {
                    copy_tiny(dest, src, n);
                }
                Band::Small => copy_stride(dest, src, n),
                Band::Medium => copy_medium(dest, src, n),
                Band::Large => return self.dispatcher.call(dest, src, n),
            }
        }
        dest
    }

    /// Safe wrapper: copies `min(dest.len(), src.len())` bytes and returns the count.
    pub fn copy_slice(&self, dest: &mut [u8], src: &[u8]) -> usize {
        let n = dest.len().min(src.len());
        // SAFETY: both slices hold at least `n` bytes, and a `&mut` slice
        // cannot alias a shared one.
        unsafe { self.route(dest.as_mut_ptr(), src.as_ptr(), n) };
        n
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    #[must_use]
    pub fn large_threshold(&self) -> usize {
        self.large_threshold
    }
}

static GLOBAL: OnceLock<Router> = OnceLock::new();

/// Process-wide router, built on first use.
///
/// Tuning comes from [`TuningConfig::load`]; if that fails the defaults are
/// used and a warning is logged.
pub fn global() -> &'static Router {
    GLOBAL.get_or_init(|| {
        let config = TuningConfig::load(None).unwrap_or_else(|err| {
            warn!(error = %err, "invalid tuning config, using defaults");
            TuningConfig::default()
        });
        let router = Router::new(Dispatcher::new_unchecked(Registry::host(), config));
        info!(
            kernels = router.dispatcher().registry().len(),
            large_threshold = router.large_threshold(),
            "self-tuning memcpy ready"
        );
        router
    })
}

/// Copies through the process-wide [`global`] router.
///
/// # Safety
///
/// - `dest` and `src` must be valid for reads/writes of `n` bytes
/// - The memory regions must not overlap
#[inline]
pub unsafe fn memcpy_selftuned(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded to the caller.
    unsafe { global().route(dest, src, n) }
}
