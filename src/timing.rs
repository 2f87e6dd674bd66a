//! Cycle-counter timing probe.
//!
//! Readings are truncated to 32 bits. A reading that wraps between the two
//! samples yields a huge difference, which the dispatcher's `elapsed < length`
//! filter throws away, so the probe does no filtering of its own.

/// A cheap, monotonically increasing (within one measurement) counter.
pub trait CycleClock: Send + Sync {
    /// Current reading, truncated to the low 32 bits.
    fn now(&self) -> u32;
}

/// Time-stamp counter on x86_64; a process-local nanosecond clock elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tsc;

#[cfg(target_arch = "x86_64")]
impl CycleClock for Tsc {
    #[inline(always)]
    fn now(&self) -> u32 {
        // SAFETY: `rdtsc` is available on every x86_64 CPU and has no
        // memory effects.
        unsafe { core::arch::x86_64::_rdtsc() as u32 }
    }
}

#[cfg(not(target_arch = "x86_64"))]
impl CycleClock for Tsc {
    #[inline]
    fn now(&self) -> u32 {
        use std::sync::OnceLock;
        use std::time::Instant;

        static EPOCH: OnceLock<Instant> = OnceLock::new();
        EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u32
    }
}

/// Runs `op` between two clock readings.
///
/// Returns the result and the wrapping difference of the readings.
#[inline(always)]
pub fn measure<C, R>(clock: &C, op: impl FnOnce() -> R) -> (R, u32)
where
    C: CycleClock + ?Sized,
{
    let start = clock.now();
    let result = op();
    let end = clock.now();
    (result, end.wrapping_sub(start))
}
