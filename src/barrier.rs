use crate::record::WriteRecord;

/// Whether a barrier write can be divided into a flush half and a data half.
///
/// A flush flag only stipulates that *previous* data is persisted and says
/// nothing about the data carried by the flagged write itself. A write that
/// carries both a flush flag and data therefore splits: the flush closes the
/// current epoch while the data belongs to the next one. FUA pins the data to
/// the flush, so FUA writes never split.
pub fn can_split(record: &WriteRecord) -> bool {
    (record.has_flush_flag() || record.has_flush_seq_flag())
        && record.has_write_flag()
        && !record.has_fua_flag()
        && record.size_bytes > 0
}

/// Splits a barrier write into `(flush_half, data_half)`.
///
/// The flush half keeps every flag but drops the data; the data half keeps
/// the data and every flag except flush and flush-seq. Callers must guard
/// with [`can_split`].
pub fn split(record: &WriteRecord) -> (WriteRecord, WriteRecord) {
    debug_assert!(can_split(record), "split requires a splittable barrier");

    let flush_half = record.without_payload();
    let mut data_half = record.clone();
    if data_half.has_flush_flag() {
        data_half = data_half.without_flush_flag();
    }
    if data_half.has_flush_seq_flag() {
        data_half = data_half.without_flush_seq_flag();
    }

    (flush_half, data_half)
}
