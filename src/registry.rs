//! Variant registry: the fixed list of candidate kernels and their statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::score::{Stats, smooth_value};

/// One candidate kernel and the evidence gathered about it.
///
/// Counters are updated with relaxed atomics only. Concurrent updates may be
/// lost; that is accepted in exchange for never blocking.
#[derive(Debug)]
pub struct VariantRecord {
    kernel: Kernel,
    time: AtomicU64,
    bytes: AtomicU64,
    count: AtomicU64,
}

impl VariantRecord {
    #[must_use]
    pub const fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            time: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub const fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Adds one accepted sample.
    #[inline]
    pub fn record(&self, elapsed: u64, bytes: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        self.time.fetch_add(elapsed, Ordering::Relaxed);
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats::new(
            self.time.load(Ordering::Relaxed),
            self.bytes.load(Ordering::Relaxed),
            self.count.load(Ordering::Relaxed),
        )
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.stats().score()
    }

    /// Decays the counters (`v ← 1 + v/2`) with plain load/store pairs.
    ///
    /// A sample recorded between the load and the store is lost.
    pub fn smooth(&self) {
        for counter in [&self.time, &self.bytes, &self.count] {
            counter.store(smooth_value(counter.load(Ordering::Relaxed)), Ordering::Relaxed);
        }
    }
}

/// Ordered, fixed-membership list of variant records.
#[derive(Debug)]
pub struct Registry {
    records: Box<[VariantRecord]>,
}

impl Registry {
    /// Builds a registry from `kernels`, in order.
    ///
    /// The first kernel is the dispatcher's initial choice, so it should be a
    /// safe baseline.
    pub fn new(kernels: impl IntoIterator<Item = Kernel>) -> Result<Self> {
        let records: Box<[VariantRecord]> = kernels.into_iter().map(VariantRecord::new).collect();
        if records.is_empty() {
            return Err(Error::EmptyRegistry);
        }
        Ok(Self { records })
    }

    /// Registry over the host kernel catalogue.
    #[must_use]
    pub fn host() -> Self {
        Self {
            records: crate::kernels::host_kernels()
                .into_iter()
                .map(VariantRecord::new)
                .collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false` for a constructed registry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[VariantRecord] {
        &self.records
    }

    /// Index of the record with the given kernel tag.
    #[must_use]
    pub fn position(&self, tag: u32) -> Option<usize> {
        self.records.iter().position(|r| r.kernel.tag() == tag)
    }
}

impl std::ops::Index<usize> for Registry {
    type Output = VariantRecord;

    #[inline]
    fn index(&self, index: usize) -> &VariantRecord {
        &self.records[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{STD, portable};

    #[test]
    fn empty_registry_is_rejected() {
        assert!(matches!(
            Registry::new(Vec::<Kernel>::new()),
            Err(Error::EmptyRegistry)
        ));
    }

    #[test]
    fn preserves_order_and_starts_empty() {
        let registry = Registry::new([
            STD,
            Kernel::new(2, "bytewise", portable::bytewise),
            Kernel::new(3, "words", portable::words),
        ])
        .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry[0].kernel().tag(), 1);
        assert_eq!(registry.position(3), Some(2));
        assert_eq!(registry.position(42), None);
        for record in registry.records() {
            assert_eq!(record.stats(), Stats::default());
            assert!(record.score().is_infinite());
        }
    }

    #[test]
    fn record_then_smooth() {
        let record = VariantRecord::new(STD);
        record.record(300, 1_000);
        record.record(500, 1_000);
        assert_eq!(record.stats(), Stats::new(800, 2_000, 2));

        record.smooth();
        assert_eq!(record.stats(), Stats::new(401, 1_001, 2));

        let empty = VariantRecord::new(STD);
        empty.smooth();
        assert_eq!(empty.stats(), Stats::new(1, 1, 1));
        assert!(empty.score().is_finite());
    }

    #[test]
    fn host_registry_matches_catalogue() {
        let registry = Registry::host();
        assert_eq!(registry.len(), crate::kernels::host_kernels().len());
        assert_eq!(registry[0].kernel().tag(), STD.tag());
    }
}
