use crate::record::{WriteRecord, KERNEL_SECTOR_SIZE};

/// Per-epoch tracker of the disk ranges touched so far.
///
/// Ranges are kept sorted by start sector and never overlap each other; a
/// write that intersects an existing range extends it in place. Extending a
/// range does not re-merge it with later neighbors it may now touch: overlap
/// detection only needs one intersecting range, not a canonical interval set.
#[derive(Debug, Default)]
pub struct OverlapTracker {
    ranges: Vec<(u64, u64)>,
}

impl OverlapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Records the sectors touched by `record` and reports whether any of
    /// them were already touched within this epoch.
    pub fn check_and_insert(&mut self, record: &WriteRecord) -> bool {
        let start = record.sector;
        // A zero-size write still occupies its start sector.
        let span = u64::from(record.size_bytes.div_ceil(KERNEL_SECTOR_SIZE as u32).max(1));
        let end = start + span - 1;

        for i in 0..self.ranges.len() {
            let (range_start, range_end) = self.ranges[i];
            if (range_start <= start && range_end >= start)
                || (range_start <= end && range_end >= end)
                || (range_start >= start && range_end <= end)
            {
                let range = &mut self.ranges[i];
                if range.0 > start {
                    range.0 = start;
                }
                if range.1 < end {
                    range.1 = end;
                }
                return true;
            } else if range_start > end {
                // Sorted list: nothing further can intersect, so this is the
                // insertion point.
                self.ranges.insert(i, (start, end));
                return false;
            }
        }

        self.ranges.push((start, end));
        false
    }

    pub fn ranges(&self) -> &[(u64, u64)] {
        &self.ranges
    }
}
