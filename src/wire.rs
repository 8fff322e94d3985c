use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use thiserror::Error;

/// Wire form of one replayable write: either a whole bio or a single sector
/// of one. This is what downstream replay consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskWriteData {
    pub is_whole_bio: bool,
    /// `abs_index` of the originating bio.
    pub bio_index: u32,
    /// 0 for whole-bio records.
    pub bio_sector_index: u32,
    pub disk_offset_bytes: u64,
    pub size_bytes: u32,
    pub payload: Arc<[u8]>,
    /// Offset of this record's view into `payload`; 0 for whole-bio records.
    pub payload_offset: u32,
}

impl DiskWriteData {
    pub fn data(&self) -> &[u8] {
        let start = self.payload_offset as usize;
        &self.payload[start..start + self.size_bytes as usize]
    }
}

/// Per-generation record handed back to the caller alongside each crash
/// state, mirroring what a replay harness persists per test.
#[derive(Debug, Clone, Default)]
pub struct CrashStateLog {
    pub crash_state: Vec<DiskWriteData>,
    /// Checkpoint-epoch id of the region the crash state falls in; stamped by
    /// the permutation policy.
    pub last_checkpoint: i32,
}

/// One journalled crash state: the replayable shape of every emitted write,
/// without payload bytes, self-checked with a CRC.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalEntry {
    pub seq: u64,
    pub last_checkpoint: i32,
    pub writes: Vec<JournalWrite>,
    pub record_crc32c: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalWrite {
    pub is_whole_bio: bool,
    pub bio_index: u32,
    pub bio_sector_index: u32,
    pub disk_offset_bytes: u64,
    pub size_bytes: u32,
}

impl JournalEntry {
    pub fn new(seq: u64, log: &CrashStateLog) -> Self {
        let writes = log
            .crash_state
            .iter()
            .map(|data| JournalWrite {
                is_whole_bio: data.is_whole_bio,
                bio_index: data.bio_index,
                bio_sector_index: data.bio_sector_index,
                disk_offset_bytes: data.disk_offset_bytes,
                size_bytes: data.size_bytes,
            })
            .collect();
        let mut entry = Self {
            seq,
            last_checkpoint: log.last_checkpoint,
            writes,
            record_crc32c: 0,
        };
        entry.record_crc32c = entry.compute_crc();
        entry
    }

    pub fn validate_crc(&self) -> bool {
        self.record_crc32c == self.compute_crc()
    }

    fn compute_crc(&self) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(&self.seq.to_le_bytes());
        hasher.update(&self.last_checkpoint.to_le_bytes());
        for write in &self.writes {
            hasher.update(&[write.is_whole_bio as u8]);
            hasher.update(&write.bio_index.to_le_bytes());
            hasher.update(&write.bio_sector_index.to_le_bytes());
            hasher.update(&write.disk_offset_bytes.to_le_bytes());
            hasher.update(&write.size_bytes.to_le_bytes());
        }
        hasher.finalize()
    }
}

/// Append-only JSON-lines journal of emitted crash states. The sink is
/// caller-supplied; the core itself never opens files.
#[derive(Debug)]
pub struct CrashStateJournal<W: Write> {
    sink: W,
    next_seq: u64,
}

impl<W: Write> CrashStateJournal<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, next_seq: 0 }
    }

    /// Appends one crash state and returns its sequence number.
    pub fn append(&mut self, log: &CrashStateLog) -> Result<u64, JournalError> {
        let seq = self.next_seq;
        let entry = JournalEntry::new(seq, log);
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.sink.write_all(&line)?;
        self.next_seq += 1;
        Ok(seq)
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Reads journalled entries back, rejecting any whose CRC does not match.
pub fn read_journal<R: BufRead>(reader: R) -> Result<Vec<JournalEntry>, JournalError> {
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: JournalEntry = serde_json::from_str(&line)?;
        if !entry.validate_crc() {
            return Err(JournalError::CorruptRecord { seq: entry.seq });
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("journal CRC mismatch at seq {seq}")]
    CorruptRecord { seq: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> CrashStateLog {
        CrashStateLog {
            crash_state: vec![DiskWriteData {
                is_whole_bio: true,
                bio_index: 4,
                bio_sector_index: 0,
                disk_offset_bytes: 8192,
                size_bytes: 4096,
                payload: Arc::from(vec![0u8; 4096]),
                payload_offset: 0,
            }],
            last_checkpoint: 1,
        }
    }

    #[test]
    fn journal_round_trips_entries() {
        let mut journal = CrashStateJournal::new(Vec::new());
        assert_eq!(journal.append(&sample_log()).unwrap(), 0);
        assert_eq!(journal.append(&sample_log()).unwrap(), 1);

        let bytes = journal.into_inner();
        let entries = read_journal(bytes.as_slice()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].seq, 0);
        assert_eq!(entries[1].seq, 1);
        assert_eq!(entries[0].writes.len(), 1);
        assert_eq!(entries[0].writes[0].bio_index, 4);
        assert_eq!(entries[0].last_checkpoint, 1);
    }

    #[test]
    fn read_journal_rejects_crc_mismatch() {
        let mut journal = CrashStateJournal::new(Vec::new());
        journal.append(&sample_log()).unwrap();
        let bytes = journal.into_inner();

        let line = String::from_utf8(bytes).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        json["record_crc32c"] = serde_json::json!(0u32);
        let mut tampered = serde_json::to_vec(&json).unwrap();
        tampered.push(b'\n');

        let err = read_journal(tampered.as_slice()).unwrap_err();
        assert!(matches!(err, JournalError::CorruptRecord { seq: 0 }));
    }

    #[test]
    fn whole_bio_data_view_spans_the_payload() {
        let log = sample_log();
        assert_eq!(log.crash_state[0].data().len(), 4096);
    }
}
