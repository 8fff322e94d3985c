//! Core library of the blockshear crash-consistency test generator:
//! segments a recorded block-I/O workload into durability epochs and
//! enumerates the crash states a compliant disk cache could expose.
#![deny(unreachable_pub)]
#![deny(unused_must_use)]
#![cfg_attr(docsrs, warn(missing_docs))]

pub mod barrier;
pub mod builder;
pub mod config;
pub mod epoch;
pub mod overlap;
pub mod permuter;
pub mod policy;
pub mod prelude;
pub mod record;
pub mod sector;
pub mod telemetry;
pub mod util;
pub mod wire;

pub use builder::{validate_workload, EpochBuilder, WorkloadError, SOFT_EPOCH_MAX_GAP_NS};
pub use config::{BuildMode, BuilderConfig, ConfigError};
pub use epoch::{Epoch, EpochOp};
pub use overlap::OverlapTracker;
pub use permuter::{CrashStatePermuter, PermutationPolicy};
pub use policy::{EpochPrefixPolicy, RandomSubsetPolicy};
pub use record::{WriteFlags, WriteRecord, KERNEL_SECTOR_SIZE};
pub use sector::{coalesce_sectors, SectorSlice};
pub use telemetry::{
    BuilderMetricsPublisher, Metric, MetricsRegistry, MetricsSnapshot, PermuterMetricsPublisher,
};
pub use util::error::{BlockshearError, Result};
pub use wire::{
    read_journal, CrashStateJournal, CrashStateLog, DiskWriteData, JournalEntry, JournalError,
    JournalWrite,
};
