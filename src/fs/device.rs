//! Virtual device behaviour
//!
//! Device content is synthesized per call and never stored: reads of
//! `zero` and `random` allocate no store entries, writes to any device are
//! discarded.

use crate::tree::DeviceKind;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

static RANDOM_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Synthesize `len` bytes of device output
pub fn read(kind: DeviceKind, len: usize) -> Vec<u8> {
    match kind {
        DeviceKind::Null => Vec::new(),
        DeviceKind::Zero => vec![0u8; len],
        DeviceKind::Random => random_bytes(len),
    }
}

/// Accept a write; returns the number of bytes consumed
pub fn write(kind: DeviceKind, data: &[u8]) -> usize {
    match kind {
        DeviceKind::Null | DeviceKind::Zero | DeviceKind::Random => data.len(),
    }
}

/// Pseudo-random bytes from the BLAKE3 extendable output, seeded per call
fn random_bytes(len: usize) -> Vec<u8> {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0);
    let counter = RANDOM_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = blake3::Hasher::new_derive_key("dagfs 2024 /dev/random");
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&counter.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());

    let mut out = vec![0u8; len];
    hasher.finalize_xof().fill(&mut out);
    out
}
