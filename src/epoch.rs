use crate::record::{WriteRecord, KERNEL_SECTOR_SIZE};
use crate::sector::SectorSlice;
use crate::wire::DiskWriteData;

/// One recorded write pinned to its position in the recorder's stream.
///
/// `abs_index` is dense from 0 and identifies the originating bio; both
/// halves of a split barrier carry the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochOp {
    pub abs_index: u32,
    pub record: WriteRecord,
}

impl EpochOp {
    pub fn new(abs_index: u32, record: WriteRecord) -> Self {
        Self { abs_index, record }
    }

    /// Whole-bio wire form of this op.
    pub fn to_write_data(&self) -> DiskWriteData {
        DiskWriteData {
            is_whole_bio: true,
            bio_index: self.abs_index,
            bio_sector_index: 0,
            disk_offset_bytes: KERNEL_SECTOR_SIZE * self.record.sector,
            size_bytes: self.record.size_bytes,
            payload: self.record.payload().clone(),
            payload_offset: 0,
        }
    }

    /// Expands this op into fixed-size sector slices sharing its payload.
    ///
    /// The last slice is short when the bio size is not a multiple of
    /// `sector_size`. A zero-size op yields no slices.
    pub fn to_sectors(&self, sector_size: u32) -> Vec<SectorSlice> {
        debug_assert!(sector_size > 0, "sector size must be non-zero");
        let num_sectors = self.record.size_bytes.div_ceil(sector_size);
        let mut slices = Vec::with_capacity(num_sectors as usize);

        for i in 0..num_sectors {
            let size = if i == num_sectors - 1 {
                self.record.size_bytes - i * sector_size
            } else {
                sector_size
            };
            slices.push(SectorSlice {
                bio_index: self.abs_index,
                sector_index: i,
                disk_offset: KERNEL_SECTOR_SIZE * self.record.sector
                    + u64::from(i) * u64::from(sector_size),
                size,
                max_sector_size: sector_size,
                payload: self.record.payload().clone(),
            });
        }

        slices
    }
}

/// Maximal run of writes that a compliant disk cache may reorder freely,
/// delimited by a durability barrier or (in soft mode) a time gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epoch {
    pub ops: Vec<EpochOp>,
    pub num_meta: u32,
    /// True when at least two ops in this epoch touch intersecting sectors.
    pub overlaps: bool,
    /// True when the last-added op carried a barrier flag.
    pub has_barrier: bool,
    /// Id of the checkpoint-bounded region containing this epoch; −1 before
    /// the first checkpoint is observed.
    pub checkpoint_epoch: i32,
}

impl Epoch {
    pub fn empty(checkpoint_epoch: i32) -> Self {
        Self {
            ops: Vec::new(),
            num_meta: 0,
            overlaps: false,
            has_barrier: false,
            checkpoint_epoch,
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WriteFlags;

    #[test]
    fn whole_bio_wire_form_uses_kernel_sector_offsets() {
        let op = EpochOp::new(
            3,
            WriteRecord::new(16, 4096, WriteFlags::WRITE, 0, vec![9; 4096]),
        );
        let data = op.to_write_data();
        assert!(data.is_whole_bio);
        assert_eq!(data.bio_index, 3);
        assert_eq!(data.bio_sector_index, 0);
        assert_eq!(data.disk_offset_bytes, 16 * 512);
        assert_eq!(data.size_bytes, 4096);
        assert_eq!(data.payload_offset, 0);
    }

    #[test]
    fn zero_size_op_decomposes_to_nothing() {
        let op = EpochOp::new(
            0,
            WriteRecord::new(0, 0, WriteFlags::WRITE | WriteFlags::FLUSH, 0, Vec::new()),
        );
        assert!(op.to_sectors(4096).is_empty());
    }
}
