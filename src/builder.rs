use crate::barrier;
use crate::config::{BuildMode, BuilderConfig, ConfigError};
use crate::epoch::{Epoch, EpochOp};
use crate::overlap::OverlapTracker;
use crate::record::WriteRecord;
use log::info;
use thiserror::Error;

/// Quiescent gap after which soft mode assumes the disk cache drained.
/// 2.5 seconds.
pub const SOFT_EPOCH_MAX_GAP_NS: u64 = 2_500_000_000;

/// Rejects recorder streams that violate the inbound contract. Checkpoint
/// markers are pure annotations and must not carry data.
pub fn validate_workload(records: &[WriteRecord]) -> Result<(), WorkloadError> {
    for (index, record) in records.iter().enumerate() {
        if record.is_checkpoint() && (record.size_bytes > 0 || !record.payload().is_empty()) {
            return Err(WorkloadError::CheckpointPayload { index });
        }
    }
    Ok(())
}

/// Segments a recorded workload into barrier-delimited epochs.
///
/// The builder owns the epoch list it produces; a build replaces the previous
/// list only after it has run to completion.
#[derive(Debug)]
pub struct EpochBuilder {
    config: BuilderConfig,
    epochs: Vec<Epoch>,
}

impl EpochBuilder {
    pub fn new(config: BuilderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            epochs: Vec::new(),
        })
    }

    /// Builds using the configured mode.
    pub fn build(&mut self, records: &[WriteRecord]) -> Result<(), WorkloadError> {
        match self.config.mode {
            BuildMode::Strict => self.build_strict(records),
            BuildMode::Soft => self.build_soft(records),
        }
    }

    /// Segments on durability flags alone: nothing is assumed persisted until
    /// a flush or FUA is seen, so the cache may hold arbitrarily old data.
    pub fn build_strict(&mut self, records: &[WriteRecord]) -> Result<(), WorkloadError> {
        validate_workload(records)?;
        let epochs = build_strict_epochs(records);
        self.finish("strict", epochs);
        Ok(())
    }

    /// Segments on durability flags plus submission-time gaps: a quiescent
    /// gap of at least `soft_gap_ns` between two writes closes the epoch even
    /// without a barrier.
    pub fn build_soft(&mut self, records: &[WriteRecord]) -> Result<(), WorkloadError> {
        validate_workload(records)?;
        let epochs = build_soft_epochs(records, self.config.soft_gap_ns);
        self.finish("soft", epochs);
        Ok(())
    }

    fn finish(&mut self, mode: &str, epochs: Vec<Epoch>) {
        let ops: usize = epochs.iter().map(|epoch| epoch.ops.len()).sum();
        let last_checkpoint = epochs.last().map(|e| e.checkpoint_epoch).unwrap_or(-1);
        info!(
            "event=epoch_build mode={} epochs={} ops={} last_checkpoint={}",
            mode,
            epochs.len(),
            ops,
            last_checkpoint
        );
        self.epochs = epochs;
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn into_epochs(self) -> Vec<Epoch> {
        self.epochs
    }

    pub fn sector_size(&self) -> u32 {
        self.config.sector_size
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }
}

fn build_strict_epochs(records: &[WriteRecord]) -> Vec<Epoch> {
    let mut epochs: Vec<Epoch> = Vec::new();
    let mut tracker = OverlapTracker::new();
    let mut open = false;
    let mut checkpoint_counter: i32 = -1;
    // The stream position doubles as abs_index: one index per recorded bio,
    // shared by both halves of a split barrier.
    let mut pos = 0usize;

    while pos < records.len() {
        if !open {
            epochs.push(Epoch::empty(checkpoint_counter));
            tracker.clear();
            open = true;
        }
        let idx = epochs.len() - 1;

        while pos < records.len() && !records[pos].is_barrier() {
            let record = &records[pos];
            if record.is_checkpoint() {
                // Markers retag the epoch they fall in and are never emitted.
                checkpoint_counter += 1;
                epochs[idx].checkpoint_epoch = checkpoint_counter;
                pos += 1;
                continue;
            }
            if tracker.check_and_insert(record) {
                epochs[idx].overlaps = true;
            }
            epochs[idx].num_meta += u32::from(record.is_meta());
            epochs[idx].ops.push(EpochOp::new(pos as u32, record.clone()));
            pos += 1;
        }

        if pos < records.len() {
            let record = &records[pos];
            assert!(record.is_barrier(), "strict epoch close requires a barrier");
            if barrier::can_split(record) {
                let (flush_half, data_half) = barrier::split(record);
                epochs[idx].num_meta += u32::from(flush_half.is_meta());
                epochs[idx].ops.push(EpochOp::new(pos as u32, flush_half));
                epochs[idx].has_barrier = true;

                // The data half opens the next epoch under the same index.
                epochs.push(Epoch::empty(checkpoint_counter));
                tracker.clear();
                tracker.check_and_insert(&data_half);
                let next = idx + 1;
                epochs[next].num_meta += u32::from(data_half.is_meta());
                epochs[next].ops.push(EpochOp::new(pos as u32, data_half));
            } else {
                epochs[idx].num_meta += u32::from(record.is_meta());
                epochs[idx].ops.push(EpochOp::new(pos as u32, record.clone()));
                epochs[idx].has_barrier = true;
                open = false;
            }
            pos += 1;
        }
    }

    epochs
}

fn build_soft_epochs(records: &[WriteRecord], max_gap_ns: u64) -> Vec<Epoch> {
    let mut epochs = vec![Epoch::empty(-1)];
    let mut tracker = OverlapTracker::new();
    let mut checkpoint_counter: i32 = -1;
    // 0 means no write seen in the current soft epoch; barriers reset it so
    // submission times are never compared across a flush boundary.
    let mut last_time_seen: u64 = 0;

    for (pos, record) in records.iter().enumerate() {
        let abs_index = pos as u32;
        if record.is_checkpoint() {
            checkpoint_counter += 1;
            // The next write may still open a new soft epoch, so only an
            // epoch with no ops takes the new checkpoint id immediately.
            let idx = epochs.len() - 1;
            if epochs[idx].ops.is_empty() {
                epochs[idx].checkpoint_epoch = checkpoint_counter;
            }
        } else if !record.is_barrier() {
            let gap_elapsed = last_time_seen > 0
                && record
                    .time_ns
                    .checked_sub(last_time_seen)
                    .is_some_and(|gap| gap >= max_gap_ns);
            if gap_elapsed {
                epochs.push(Epoch::empty(checkpoint_counter));
                tracker.clear();
            }
            let idx = epochs.len() - 1;
            if tracker.check_and_insert(record) {
                epochs[idx].overlaps = true;
            }
            epochs[idx].num_meta += u32::from(record.is_meta());
            epochs[idx].ops.push(EpochOp::new(abs_index, record.clone()));
            last_time_seen = record.time_ns;
        } else {
            let idx = epochs.len() - 1;
            if barrier::can_split(record) {
                let (flush_half, data_half) = barrier::split(record);
                epochs[idx].num_meta += u32::from(flush_half.is_meta());
                epochs[idx].ops.push(EpochOp::new(abs_index, flush_half));
                epochs[idx].has_barrier = true;

                epochs.push(Epoch::empty(checkpoint_counter));
                tracker.clear();
                tracker.check_and_insert(&data_half);
                let next = idx + 1;
                epochs[next].num_meta += u32::from(data_half.is_meta());
                epochs[next].ops.push(EpochOp::new(abs_index, data_half));
            } else {
                epochs[idx].num_meta += u32::from(record.is_meta());
                epochs[idx].ops.push(EpochOp::new(abs_index, record.clone()));
                epochs[idx].has_barrier = true;

                epochs.push(Epoch::empty(checkpoint_counter));
                tracker.clear();
            }
            last_time_seen = 0;
        }
    }

    // The always-open invariant can leave one trailing empty epoch that says
    // nothing new; drop it unless it carries a fresh checkpoint id.
    if epochs.len() > 1 {
        let last = epochs.len() - 1;
        if epochs[last].ops.is_empty()
            && epochs[last].checkpoint_epoch == epochs[last - 1].checkpoint_epoch
        {
            epochs.pop();
        }
    }

    epochs
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("checkpoint marker at stream index {index} carries data")]
    CheckpointPayload { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WriteFlags;

    fn write(sector: u64, size_bytes: u32, flags: WriteFlags) -> WriteRecord {
        WriteRecord::new(sector, size_bytes, flags, 0, vec![0u8; size_bytes as usize])
    }

    #[test]
    fn strict_build_groups_writes_under_their_barrier() {
        let records = vec![
            write(0, 4096, WriteFlags::WRITE),
            write(8, 4096, WriteFlags::WRITE),
            write(16, 4096, WriteFlags::WRITE | WriteFlags::FUA),
            write(24, 4096, WriteFlags::WRITE),
        ];
        let mut builder = EpochBuilder::new(BuilderConfig::strict(4096)).unwrap();
        builder.build_strict(&records).unwrap();

        let epochs = builder.epochs();
        assert_eq!(epochs.len(), 2);
        assert_eq!(epochs[0].len(), 3);
        assert!(epochs[0].has_barrier);
        assert_eq!(epochs[1].len(), 1);
        assert!(!epochs[1].has_barrier);
    }

    #[test]
    fn split_barrier_halves_share_their_index() {
        let records = vec![
            write(0, 4096, WriteFlags::WRITE),
            write(16, 8192, WriteFlags::WRITE | WriteFlags::FLUSH),
        ];
        let mut builder = EpochBuilder::new(BuilderConfig::strict(4096)).unwrap();
        builder.build_strict(&records).unwrap();

        let epochs = builder.epochs();
        assert_eq!(epochs.len(), 2);
        assert_eq!(epochs[0].ops[1].abs_index, 1);
        assert_eq!(epochs[0].ops[1].record.size_bytes, 0);
        assert_eq!(epochs[1].ops[0].abs_index, 1);
        assert_eq!(epochs[1].ops[0].record.size_bytes, 8192);
        assert!(!epochs[1].ops[0].record.is_barrier());
    }

    #[test]
    fn build_dispatches_on_configured_mode() {
        let records = vec![write(0, 4096, WriteFlags::WRITE)];
        let mut builder = EpochBuilder::new(BuilderConfig::soft(4096)).unwrap();
        builder.build(&records).unwrap();
        assert_eq!(builder.epochs().len(), 1);
        assert_eq!(builder.epochs()[0].checkpoint_epoch, -1);
    }

    #[test]
    fn checkpoint_with_payload_is_rejected() {
        let bogus = WriteRecord::new(0, 512, WriteFlags::CHECKPOINT, 0, vec![1u8; 512]);
        let err = validate_workload(&[bogus]).unwrap_err();
        assert_eq!(err, WorkloadError::CheckpointPayload { index: 0 });
    }

    #[test]
    fn rejected_build_keeps_the_previous_epoch_list() {
        let mut builder = EpochBuilder::new(BuilderConfig::strict(4096)).unwrap();
        builder
            .build_strict(&[write(0, 4096, WriteFlags::WRITE)])
            .unwrap();
        assert_eq!(builder.epochs().len(), 1);

        let bogus = WriteRecord::new(0, 512, WriteFlags::CHECKPOINT, 0, vec![1u8; 512]);
        assert!(builder.build_strict(&[bogus]).is_err());
        assert_eq!(builder.epochs().len(), 1);
    }
}
