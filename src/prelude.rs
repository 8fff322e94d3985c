//! Convenience re-exports for downstream crates. Pull this module in via
//! `use blockshear::prelude::*;` when you want the most common types without
//! spelunking the module tree.

pub use crate::builder::EpochBuilder;
pub use crate::config::{BuildMode, BuilderConfig};
pub use crate::epoch::{Epoch, EpochOp};
pub use crate::permuter::{CrashStatePermuter, PermutationPolicy};
pub use crate::policy::{EpochPrefixPolicy, RandomSubsetPolicy};
pub use crate::record::{WriteFlags, WriteRecord};
pub use crate::util::error::{BlockshearError, Result as BlockshearResult};
pub use crate::wire::{CrashStateLog, DiskWriteData};
