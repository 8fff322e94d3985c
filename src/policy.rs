use crate::epoch::{Epoch, EpochOp};
use crate::permuter::PermutationPolicy;
use crate::sector::{coalesce_sectors, SectorSlice};
use crate::wire::{CrashStateLog, DiskWriteData};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Deterministic policy that walks every prefix of the recorded stream, from
/// the empty disk up to the fully persisted one.
///
/// Whole-bio and sector cursors advance independently, so one policy instance
/// can back a permuter in either mode.
#[derive(Debug, Default)]
pub struct EpochPrefixPolicy {
    next_prefix: usize,
    next_sector_prefix: usize,
}

impl EpochPrefixPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.next_prefix = 0;
        self.next_sector_prefix = 0;
    }
}

impl PermutationPolicy for EpochPrefixPolicy {
    fn gen_one_state(
        &mut self,
        epochs: &[Epoch],
        _sector_size: u32,
        out: &mut Vec<EpochOp>,
        log: &mut CrashStateLog,
    ) -> bool {
        out.clear();
        let total: usize = epochs.iter().map(Epoch::len).sum();
        if self.next_prefix > total {
            return false;
        }

        log.last_checkpoint = epochs.first().map(|e| e.checkpoint_epoch).unwrap_or(-1);
        let mut remaining = self.next_prefix;
        for epoch in epochs {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(epoch.len());
            out.extend(epoch.ops[..take].iter().cloned());
            remaining -= take;
            if take > 0 {
                log.last_checkpoint = epoch.checkpoint_epoch;
            }
        }

        self.next_prefix += 1;
        true
    }

    fn gen_one_sector_state(
        &mut self,
        epochs: &[Epoch],
        sector_size: u32,
        out: &mut Vec<DiskWriteData>,
        log: &mut CrashStateLog,
    ) -> bool {
        out.clear();
        let mut slices: Vec<SectorSlice> = Vec::new();
        let mut slice_checkpoints: Vec<i32> = Vec::new();
        for epoch in epochs {
            for op in &epoch.ops {
                let expanded = op.to_sectors(sector_size);
                slice_checkpoints
                    .extend(std::iter::repeat(epoch.checkpoint_epoch).take(expanded.len()));
                slices.extend(expanded);
            }
        }

        if self.next_sector_prefix > slices.len() {
            return false;
        }

        let cut = self.next_sector_prefix;
        log.last_checkpoint = if cut > 0 {
            slice_checkpoints[cut - 1]
        } else {
            epochs.first().map(|e| e.checkpoint_epoch).unwrap_or(-1)
        };
        for slice in coalesce_sectors(&slices[..cut]) {
            out.push(slice.to_write_data());
        }

        self.next_sector_prefix += 1;
        true
    }
}

/// Sampling policy: picks a crash epoch, keeps every earlier epoch whole, and
/// persists a random subset of the crash epoch's ops.
///
/// When the crash epoch has overlapping writes the sampled ops keep their
/// submission order so later data still lands over earlier data; otherwise
/// the subset is emitted in a random order. Seeded so a test run can be
/// reproduced; never exhausts (the permuter's retry budget bounds it).
#[derive(Debug)]
pub struct RandomSubsetPolicy {
    rng: ChaCha20Rng,
}

impl RandomSubsetPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    fn sample_indices(&mut self, len: usize, keep_order: bool) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(&mut self.rng);
        let keep = self.rng.gen_range(0..=len);
        indices.truncate(keep);
        if keep_order {
            indices.sort_unstable();
        }
        indices
    }
}

impl PermutationPolicy for RandomSubsetPolicy {
    fn gen_one_state(
        &mut self,
        epochs: &[Epoch],
        _sector_size: u32,
        out: &mut Vec<EpochOp>,
        log: &mut CrashStateLog,
    ) -> bool {
        out.clear();
        if epochs.is_empty() {
            log.last_checkpoint = -1;
            return true;
        }

        let crash_epoch = self.rng.gen_range(0..epochs.len());
        for epoch in &epochs[..crash_epoch] {
            out.extend(epoch.ops.iter().cloned());
        }

        let epoch = &epochs[crash_epoch];
        for index in self.sample_indices(epoch.len(), epoch.overlaps) {
            out.push(epoch.ops[index].clone());
        }
        log.last_checkpoint = epoch.checkpoint_epoch;
        true
    }

    fn gen_one_sector_state(
        &mut self,
        epochs: &[Epoch],
        sector_size: u32,
        out: &mut Vec<DiskWriteData>,
        log: &mut CrashStateLog,
    ) -> bool {
        out.clear();
        if epochs.is_empty() {
            log.last_checkpoint = -1;
            return true;
        }

        let crash_epoch = self.rng.gen_range(0..epochs.len());
        for epoch in &epochs[..crash_epoch] {
            let mut slices = Vec::new();
            for op in &epoch.ops {
                slices.extend(op.to_sectors(sector_size));
            }
            for slice in coalesce_sectors(&slices) {
                out.push(slice.to_write_data());
            }
        }

        let epoch = &epochs[crash_epoch];
        let mut slices = Vec::new();
        for op in &epoch.ops {
            slices.extend(op.to_sectors(sector_size));
        }
        let sampled: Vec<SectorSlice> = self
            .sample_indices(slices.len(), epoch.overlaps)
            .into_iter()
            .map(|index| slices[index].clone())
            .collect();
        for slice in coalesce_sectors(&sampled) {
            out.push(slice.to_write_data());
        }
        log.last_checkpoint = epoch.checkpoint_epoch;
        true
    }
}
