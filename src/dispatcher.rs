//! Adaptive kernel dispatcher.
//!
//! Each call either *exploits* the kernel currently believed fastest, with no
//! timing overhead, or *explores*: runs a pseudo-randomly chosen kernel between
//! two cycle-counter reads and adds the sample to that kernel's record. Every
//! `exploration_horizon` explorations the dispatcher re-scores all records,
//! publishes the best one and lowers the exploration rate.
//!
//! The explore/exploit gate is cyclic: call `i` exploits when
//! `i % bucket_size < exploration_threshold`. No random draw is made per call.
//!
//! All shared state is relaxed atomics. Concurrent callers may lose counter
//! updates or both run re-selection; either outcome is still a valid state.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::TuningConfig;
use crate::error::Result;
use crate::kernel::Kernel;
use crate::registry::Registry;
use crate::score::Stats;
use crate::timing::{CycleClock, Tsc, measure};

/// Maps an exploration counter value to a registry index.
///
/// A multiply-xorshift avalanche spreads consecutive counters over the whole
/// registry without any shared RNG state.
#[inline]
#[must_use]
pub fn variant_index(counter: usize, len: usize) -> usize {
    let mut hash = (counter as u64).wrapping_mul(0xff51_afd7_ed55_8ccd);
    hash ^= hash >> 33;
    (hash % len as u64) as usize
}

/// Anneals the exploit threshold.
///
/// The threshold implies an exploration probability `p = 1 - t / bucket_size`.
/// `p` is divided by `factor` and converted back, clamped to `bucket_size - 1`.
#[must_use]
pub fn next_threshold(threshold: usize, bucket_size: usize, factor: f64) -> usize {
    let buckets = bucket_size as f64;
    let probability = (1.0 - threshold as f64 / buckets) / factor;
    let next = (buckets * (1.0 - probability)) as usize;
    next.min(bucket_size - 1)
}

/// Self-tuning selector over a [`Registry`].
#[derive(Debug)]
pub struct Dispatcher<C: CycleClock = Tsc> {
    registry: Registry,
    config: TuningConfig,
    clock: C,
    selected: AtomicUsize,
    calls: AtomicUsize,
    explorations: AtomicUsize,
    threshold: AtomicUsize,
    maintaining: AtomicBool,
}

impl Dispatcher<Tsc> {
    /// Dispatcher timed with the hardware cycle counter.
    pub fn new(registry: Registry, config: TuningConfig) -> Result<Self> {
        Self::with_clock(registry, config, Tsc)
    }

    /// For configs that were already validated.
    pub(crate) fn new_unchecked(registry: Registry, config: TuningConfig) -> Self {
        Self::build(registry, config, Tsc)
    }
}

impl<C: CycleClock> Dispatcher<C> {
    /// Dispatcher timed with `clock`.
    ///
    /// Starts on registry entry 0 with an exploit threshold of 0, so every call
    /// explores until the first re-selection.
    pub fn with_clock(registry: Registry, config: TuningConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(registry, config, clock))
    }

    fn build(registry: Registry, config: TuningConfig, clock: C) -> Self {
        Self {
            registry,
            config,
            clock,
            selected: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            explorations: AtomicUsize::new(0),
            threshold: AtomicUsize::new(0),
            maintaining: AtomicBool::new(false),
        }
    }

    /// Copies `n` bytes with either the selected kernel or an explored one.
    ///
    /// # Safety
    ///
    /// - `dest` and `src` must be valid for reads/writes of `n` bytes
    /// - The memory regions must not overlap
    #[inline]
    pub unsafe fn call(&self, dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
        let current = self.calls.fetch_add(1, Ordering::Relaxed);

        if current % self.config.bucket_size < self.threshold.load(Ordering::Relaxed) {
            let kernel = self.registry[self.selected.load(Ordering::Relaxed)].kernel();
            // SAFETY: forwarded to the caller.
            unsafe { kernel.copy(dest, src, n) }
        } else {
            // SAFETY: forwarded to the caller.
            unsafe { self.explore(dest, src, n) }
        }
    }

    unsafe fn explore(&self, dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
        let current = self.explorations.fetch_add(1, Ordering::Relaxed);
        let record = &self.registry[variant_index(current, self.registry.len())];

        // SAFETY: forwarded to the caller.
        let (ret, elapsed) = measure(&self.clock, || unsafe { record.kernel().copy(dest, src, n) });

        // Faster than one cycle per byte is implausible: an interrupt, a
        // migration or a counter wrap corrupted the sample.
        if u64::from(elapsed) < n as u64 {
            record.record(u64::from(elapsed), n as u64);
        } else {
            trace!(
                tag = record.kernel().tag(),
                elapsed,
                bytes = n,
                "discarded copy timing sample"
            );
        }

        if current == self.config.exploration_horizon {
            self.maintain();
        }

        ret
    }

    /// Re-selects the best kernel and anneals the exploration rate.
    ///
    /// Called automatically when the exploration counter reaches the horizon.
    /// With `exclusive_maintenance`, a caller that finds another thread
    /// already re-selecting restarts the exploration count and returns, so
    /// the horizon stays reachable.
    pub fn maintain(&self) {
        if self.config.exclusive_maintenance
            && self
                .maintaining
                .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
                .is_err()
        {
            self.explorations.store(0, Ordering::Relaxed);
            trace!("re-selection already running, skipped");
            return;
        }

        self.reselect();

        if self.config.exclusive_maintenance {
            self.maintaining.store(false, Ordering::Relaxed);
        }
    }

    fn reselect(&self) {
        let threshold = next_threshold(
            self.threshold.load(Ordering::Relaxed),
            self.config.bucket_size,
            self.config.annealing_factor,
        );
        self.threshold.store(threshold, Ordering::Relaxed);
        self.explorations.store(0, Ordering::Relaxed);

        let mut best = 0;
        let mut best_score = f64::INFINITY;
        for (index, record) in self.registry.records().iter().enumerate() {
            let score = record.score();
            record.smooth();
            if score < best_score {
                best_score = score;
                best = index;
            }
        }

        self.selected.store(best, Ordering::Relaxed);

        let kernel = self.registry[best].kernel();
        debug!(
            tag = kernel.tag(),
            name = kernel.name(),
            score = best_score,
            threshold,
            "selected copy kernel"
        );
    }

    /// Kernel every exploiting call currently uses.
    #[must_use]
    pub fn selected(&self) -> &Kernel {
        self.registry[self.selected.load(Ordering::Relaxed)].kernel()
    }

    #[must_use]
    pub fn selected_index(&self) -> usize {
        self.selected.load(Ordering::Relaxed)
    }

    /// Number of exploit slots out of every `bucket_size` calls.
    #[must_use]
    pub fn exploration_threshold(&self) -> usize {
        self.threshold.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Explorations since the last re-selection.
    #[must_use]
    pub fn explorations(&self) -> usize {
        self.explorations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    /// Point-in-time view of the dispatcher and every variant.
    #[must_use]
    pub fn report(&self) -> DispatcherReport {
        let selected = self.selected();
        DispatcherReport {
            selected_tag: selected.tag(),
            selected_name: selected.name(),
            exploration_threshold: self.exploration_threshold(),
            bucket_size: self.config.bucket_size,
            calls: self.calls(),
            explorations: self.explorations(),
            variants: self
                .registry
                .records()
                .iter()
                .map(|record| {
                    let stats = record.stats();
                    let score = stats.score();
                    VariantReport {
                        tag: record.kernel().tag(),
                        name: record.kernel().name(),
                        stats,
                        score: score.is_finite().then_some(score),
                    }
                })
                .collect(),
        }
    }
}

/// Serializable dispatcher snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherReport {
    pub selected_tag: u32,
    pub selected_name: &'static str,
    pub exploration_threshold: usize,
    pub bucket_size: usize,
    pub calls: usize,
    pub explorations: usize,
    pub variants: Vec<VariantReport>,
}

/// Serializable per-variant snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct VariantReport {
    pub tag: u32,
    pub name: &'static str,
    #[serde(flatten)]
    pub stats: Stats,
    /// `None` until the variant has evidence.
    pub score: Option<f64>,
}
