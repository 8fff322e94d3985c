use crate::builder::EpochBuilder;
use crate::epoch::{Epoch, EpochOp};
use crate::wire::{CrashStateLog, DiskWriteData};
use log::debug;
use std::collections::HashSet;

const RETRY_MULTIPLIER: u64 = 2;
const MIN_RETRIES: u64 = 1000;

/// Strategy hook that produces candidate crash states from a built epoch
/// list. Implementations replace the contents of `out` on every call and
/// return false once their state space is exhausted.
pub trait PermutationPolicy {
    /// Fills `out` with an ordered subsequence of ops representing one legal
    /// crash state at whole-write granularity.
    fn gen_one_state(
        &mut self,
        epochs: &[Epoch],
        sector_size: u32,
        out: &mut Vec<EpochOp>,
        log: &mut CrashStateLog,
    ) -> bool;

    /// Sector-granularity variant, emitting already-coalesced sector
    /// records.
    fn gen_one_sector_state(
        &mut self,
        epochs: &[Epoch],
        sector_size: u32,
        out: &mut Vec<DiskWriteData>,
        log: &mut CrashStateLog,
    ) -> bool;
}

/// Drives a permutation policy and deduplicates the crash states it yields.
///
/// Each accepted state is fingerprinted; a duplicate candidate is retried
/// against a budget that grows with the number of known states, so a
/// near-exhausted policy still gets many chances to find the remainder.
#[derive(Debug)]
pub struct CrashStatePermuter<P> {
    policy: P,
    epochs: Vec<Epoch>,
    sector_size: u32,
    completed: HashSet<Vec<u32>>,
    states_accepted: u64,
    duplicates_rejected: u64,
}

impl<P: PermutationPolicy> CrashStatePermuter<P> {
    pub fn new(policy: P, epochs: Vec<Epoch>, sector_size: u32) -> Self {
        Self {
            policy,
            epochs,
            sector_size,
            completed: HashSet::new(),
            states_accepted: 0,
            duplicates_rejected: 0,
        }
    }

    /// Takes over a builder's finished epoch list and sector size.
    pub fn from_builder(policy: P, builder: EpochBuilder) -> Self {
        let sector_size = builder.sector_size();
        Self::new(policy, builder.into_epochs(), sector_size)
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Number of distinct fingerprints accepted so far.
    pub fn known_states(&self) -> usize {
        self.completed.len()
    }

    pub fn states_accepted(&self) -> u64 {
        self.states_accepted
    }

    pub fn duplicates_rejected(&self) -> u64 {
        self.duplicates_rejected
    }

    /// Produces one new whole-bio crash state, or returns false when the
    /// policy is exhausted or the retry budget ran out on duplicates. `res`
    /// and the caller's log are filled either way.
    pub fn generate_crash_state(
        &mut self,
        res: &mut Vec<DiskWriteData>,
        log: &mut CrashStateLog,
    ) -> bool {
        let mut crash_state: Vec<EpochOp> = Vec::new();
        let mut fingerprint: Vec<u32> = Vec::new();
        let mut retries: u64 = 0;
        let max_retries = self.max_retries();
        let new_state;
        let exists;

        loop {
            let candidate_is_new =
                self.policy
                    .gen_one_state(&self.epochs, self.sector_size, &mut crash_state, log);

            fingerprint.clear();
            fingerprint.extend(crash_state.iter().map(|op| op.abs_index));

            retries += 1;
            let duplicate = self.completed.contains(&fingerprint);
            if duplicate {
                self.duplicates_rejected += 1;
            }
            if !candidate_is_new || retries >= max_retries {
                new_state = candidate_is_new;
                exists = duplicate;
                break;
            }
            if !duplicate {
                new_state = candidate_is_new;
                exists = false;
                break;
            }
        }

        res.clear();
        res.extend(crash_state.iter().map(EpochOp::to_write_data));
        log.crash_state = res.clone();

        if !exists {
            self.completed.insert(fingerprint);
            self.states_accepted += 1;
            return new_state;
        }

        debug!(
            "event=crash_state_saturated granularity=whole retries={} known={}",
            retries,
            self.completed.len()
        );
        false
    }

    /// Sector-granularity counterpart of [`generate_crash_state`].
    ///
    /// [`generate_crash_state`]: CrashStatePermuter::generate_crash_state
    pub fn generate_sector_crash_state(
        &mut self,
        res: &mut Vec<DiskWriteData>,
        log: &mut CrashStateLog,
    ) -> bool {
        let mut fingerprint: Vec<u32> = Vec::new();
        let mut retries: u64 = 0;
        let max_retries = self.max_retries();
        let new_state;
        let exists;

        loop {
            let candidate_is_new =
                self.policy
                    .gen_one_sector_state(&self.epochs, self.sector_size, res, log);

            // Sector states need both the bio index and the sector's position
            // within it to be identified uniquely.
            fingerprint.clear();
            for data in res.iter() {
                fingerprint.push(data.bio_index);
                fingerprint.push(data.bio_sector_index);
            }

            retries += 1;
            let duplicate = self.completed.contains(&fingerprint);
            if duplicate {
                self.duplicates_rejected += 1;
            }
            if !candidate_is_new || retries >= max_retries {
                new_state = candidate_is_new;
                exists = duplicate;
                break;
            }
            if !duplicate {
                new_state = candidate_is_new;
                exists = false;
                break;
            }
        }

        log.crash_state = res.clone();

        if !exists {
            self.completed.insert(fingerprint);
            self.states_accepted += 1;
            return new_state;
        }

        debug!(
            "event=crash_state_saturated granularity=sector retries={} known={}",
            retries,
            self.completed.len()
        );
        false
    }

    fn max_retries(&self) -> u64 {
        (RETRY_MULTIPLIER * self.completed.len() as u64).max(MIN_RETRIES)
    }
}
