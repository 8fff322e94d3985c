use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use std::sync::Arc;

/// Size of a kernel sector in bytes. Sector numbers in [`WriteRecord`] are
/// expressed in these units regardless of the sector size chosen for
/// decomposition.
pub const KERNEL_SECTOR_SIZE: u64 = 512;

/// Flag set attached to a recorded block write, modeled after the bio flags
/// the workload recorder captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteFlags(u16);

impl WriteFlags {
    pub const NONE: WriteFlags = WriteFlags(0);
    pub const WRITE: WriteFlags = WriteFlags(1);
    pub const FLUSH: WriteFlags = WriteFlags(1 << 1);
    /// Flush issued as part of the block layer's flush sequence.
    pub const FLUSH_SEQ: WriteFlags = WriteFlags(1 << 2);
    pub const FUA: WriteFlags = WriteFlags(1 << 3);
    pub const META: WriteFlags = WriteFlags(1 << 4);
    /// Externally injected marker, never emitted to disk.
    pub const CHECKPOINT: WriteFlags = WriteFlags(1 << 5);

    pub fn contains(&self, other: WriteFlags) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn intersects(&self, other: WriteFlags) -> bool {
        (self.0 & other.0) != 0
    }

    pub fn insert(&mut self, other: WriteFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: WriteFlags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn bits(&self) -> u16 {
        self.0
    }
}

impl BitOr for WriteFlags {
    type Output = WriteFlags;

    fn bitor(self, rhs: WriteFlags) -> WriteFlags {
        WriteFlags(self.0 | rhs.0)
    }
}

/// One recorded block write as handed over by the workload recorder.
///
/// The payload buffer is shared and read-only after construction; clones of a
/// record (and any sector slices derived from it) alias the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub sector: u64,
    pub size_bytes: u32,
    pub flags: WriteFlags,
    pub time_ns: u64,
    payload: Arc<[u8]>,
}

impl WriteRecord {
    pub fn new(
        sector: u64,
        size_bytes: u32,
        flags: WriteFlags,
        time_ns: u64,
        payload: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            sector,
            size_bytes,
            flags,
            time_ns,
            payload: payload.into(),
        }
    }

    /// Builds the marker record the recorder injects at checkpoint boundaries.
    pub fn checkpoint_marker(time_ns: u64) -> Self {
        Self::new(0, 0, WriteFlags::CHECKPOINT, time_ns, Vec::new())
    }

    pub fn payload(&self) -> &Arc<[u8]> {
        &self.payload
    }

    /// A barrier ends the epoch it appears in: the disk must not reorder
    /// writes across it.
    pub fn is_barrier(&self) -> bool {
        self.flags
            .intersects(WriteFlags::FLUSH | WriteFlags::FLUSH_SEQ | WriteFlags::FUA)
    }

    pub fn is_checkpoint(&self) -> bool {
        self.flags.contains(WriteFlags::CHECKPOINT)
    }

    pub fn is_meta(&self) -> bool {
        self.flags.contains(WriteFlags::META)
    }

    pub fn has_write_flag(&self) -> bool {
        self.flags.contains(WriteFlags::WRITE)
    }

    pub fn has_flush_flag(&self) -> bool {
        self.flags.contains(WriteFlags::FLUSH)
    }

    pub fn has_flush_seq_flag(&self) -> bool {
        self.flags.contains(WriteFlags::FLUSH_SEQ)
    }

    pub fn has_fua_flag(&self) -> bool {
        self.flags.contains(WriteFlags::FUA)
    }

    pub fn without_flush_flag(&self) -> WriteRecord {
        let mut record = self.clone();
        record.flags.remove(WriteFlags::FLUSH);
        record
    }

    pub fn without_flush_seq_flag(&self) -> WriteRecord {
        let mut record = self.clone();
        record.flags.remove(WriteFlags::FLUSH_SEQ);
        record
    }

    /// Copy with the data dropped: zero size and an empty payload buffer.
    pub fn without_payload(&self) -> WriteRecord {
        let mut record = self.clone();
        record.size_bytes = 0;
        record.payload = Arc::from(Vec::new());
        record
    }
}
