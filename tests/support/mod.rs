#![allow(dead_code)]

use blockshear::{WriteFlags, WriteRecord};

/// Builds a data write whose payload is a recognizable per-sector pattern.
pub fn write_at(sector: u64, size_bytes: u32, flags: WriteFlags, time_ns: u64) -> WriteRecord {
    let payload: Vec<u8> = (0..size_bytes)
        .map(|i| (sector as u32).wrapping_add(i) as u8)
        .collect();
    WriteRecord::new(sector, size_bytes, flags, time_ns, payload)
}

pub fn write(sector: u64, size_bytes: u32, flags: WriteFlags) -> WriteRecord {
    write_at(sector, size_bytes, flags, 0)
}

pub fn data(sector: u64, size_bytes: u32) -> WriteRecord {
    write(sector, size_bytes, WriteFlags::WRITE)
}

pub fn checkpoint() -> WriteRecord {
    WriteRecord::checkpoint_marker(0)
}
