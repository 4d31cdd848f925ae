//! # BitField — Packed Composite Flags
//!
//! One bit per integer in [0, len): 8× memory reduction over `Vec<bool>`,
//! so a 2^20 sieve fits in 128 KiB and stays L2-resident. A set bit means
//! the index has been **proven composite**; a clear bit means it is still
//! assumed prime. Bits are only ever set, never cleared, so the field is
//! monotone over the life of a run.
//!
//! Bit layout: index `i` lives in byte `i / 8`, at mask `0x80 >> (i % 8)`
//! (bit 0 of a byte is the most-significant bit). The translation is private;
//! callers address the field by logical index only.

use anyhow::{anyhow, Result};

/// Packed composite-flag array over the range [0, len).
pub struct BitField {
    bytes: Vec<u8>,
    len: u64,
}

impl BitField {
    /// Allocate a field of `len` bits, all clear (every index assumed prime).
    ///
    /// Allocation is fallible and reported rather than aborting: for large
    /// bounds the buffer is the entire memory footprint of a run, and a
    /// refused reservation is a normal outcome, not a bug.
    pub fn new(len: u64) -> Result<Self> {
        let num_bytes = usize::try_from(len.div_ceil(8))
            .map_err(|_| anyhow!("sieve of {} bits is not addressable on this platform", len))?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(num_bytes)
            .map_err(|e| anyhow!("failed to allocate {} byte sieve buffer: {}", num_bytes, e))?;
        bytes.resize(num_bytes, 0);
        Ok(BitField { bytes, len })
    }

    /// Number of bits in this field.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the field has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get bit `index`. Returns `true` if the index has been marked composite.
    ///
    /// # Panics
    /// Debug builds panic if `index >= len`.
    #[inline]
    pub fn get(&self, index: u64) -> bool {
        debug_assert!(
            index < self.len,
            "BitField index out of bounds: {} >= {}",
            index,
            self.len
        );
        self.bytes[(index / 8) as usize] & (0x80u8 >> (index % 8)) != 0
    }

    /// Mark `index` as composite. Idempotent: re-marking a set bit is a no-op.
    #[inline]
    pub fn set_composite(&mut self, index: u64) {
        debug_assert!(index < self.len);
        self.bytes[(index / 8) as usize] |= 0x80u8 >> (index % 8);
    }
}
