//! tunedcopy: a self-tuning `memcpy`.
//!
//! Small and medium copies take fixed, size-tiered fast paths. Copies of at
//! least [`TuningConfig::large_threshold`] bytes go through a [`Dispatcher`]
//! that keeps timing a catalogue of kernels while it copies and drifts
//! towards the cheapest one per byte.
//!
//! ```no_run
//! let src = vec![7u8; 1 << 20];
//! let mut dst = vec![0u8; 1 << 20];
//! tunedcopy::global().copy_slice(&mut dst, &src);
//! assert_eq!(dst, src);
//! ```

pub mod bench;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod kernel;
pub mod kernels;
pub mod registry;
pub mod router;
pub mod score;
pub mod timing;

pub use config::TuningConfig;
pub use dispatcher::{Dispatcher, DispatcherReport, VariantReport};
pub use error::{Error, Result};
pub use kernel::{CopyFn, Kernel};
pub use registry::{Registry, VariantRecord};
pub use router::{Band, Router, global, memcpy_selftuned};
pub use score::Stats;
pub use timing::{CycleClock, Tsc};
