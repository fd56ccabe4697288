//! Cache maintenance policy for DMA-fed buffer edges.
//!
//! Payload memory sits in cacheable RAM while some endpoints write or read it
//! through DMA engines that bypass the data cache. Every transfer therefore
//! has to decide whether the affected byte range must be invalidated (so the
//! core re-reads RAM) or written back (so DMA reads what the core wrote).
//! The decision depends only on which side of the buffer is DMA-connected:
//!
//! | source DMA | sink DMA | on produce   | on consume   |
//! |------------|----------|--------------|--------------|
//! | yes        | no       | invalidate   | —            |
//! | no         | yes      | write back   | write back   |
//! | yes        | yes      | —            | —            |
//! | no         | no       | —            | —            |
//!
//! The actual line operations are a platform concern behind [`CacheOps`]; a
//! port loops over cache-line-aligned addresses with its core's clean /
//! invalidate-by-address primitives. [`Coherent`] is the no-op backend for
//! targets where hardware keeps DMA coherent (and for host builds).

/// Cache maintenance operation selected for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheAction {
    /// Memory is coherent for this endpoint pairing; do nothing.
    None,
    /// Drop cached lines over the range so the core sees DMA-written data.
    Invalidate,
    /// Push dirty lines over the range to RAM so DMA sees core-written data.
    Writeback,
}

/// Platform backend performing the line operations over a byte range.
///
/// Implementations must tolerate ranges that are not cache-line aligned by
/// widening to the enclosing lines, and must not assume the range is mapped
/// beyond `len` bytes.
pub trait CacheOps {
    /// Invalidate all cache lines covering `[addr, addr + len)`.
    fn invalidate_region(&self, addr: *mut u8, len: usize);

    /// Write back all cache lines covering `[addr, addr + len)`.
    fn writeback_region(&self, addr: *const u8, len: usize);
}

/// No-op backend for coherent targets and host builds.
#[derive(Debug, Default, Clone, Copy)]
pub struct Coherent;

impl CacheOps for Coherent {
    fn invalidate_region(&self, _addr: *mut u8, _len: usize) {}

    fn writeback_region(&self, _addr: *const u8, _len: usize) {}
}

/// Action to apply over the span just written, before the write cursor moves.
pub fn produce_action(source_dma: bool, sink_dma: bool) -> CacheAction {
    match (source_dma, sink_dma) {
        // DMA wrote RAM behind the cache; the non-DMA reader must not see
        // stale lines.
        (true, false) => CacheAction::Invalidate,
        // The core wrote through the cache; the DMA reader only sees RAM.
        (false, true) => CacheAction::Writeback,
        _ => CacheAction::None,
    }
}

/// Action to apply after the read cursor has advanced.
pub fn consume_action(source_dma: bool, sink_dma: bool) -> CacheAction {
    match (source_dma, sink_dma) {
        // Push any trailing core writes through for the DMA reader.
        (false, true) => CacheAction::Writeback,
        _ => CacheAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produce_dma_source_invalidates() {
        assert_eq!(produce_action(true, false), CacheAction::Invalidate);
    }

    #[test]
    fn produce_dma_sink_writes_back() {
        assert_eq!(produce_action(false, true), CacheAction::Writeback);
    }

    #[test]
    fn produce_coherent_pairs_do_nothing() {
        assert_eq!(produce_action(true, true), CacheAction::None);
        assert_eq!(produce_action(false, false), CacheAction::None);
    }

    #[test]
    fn consume_only_dma_sink_writes_back() {
        assert_eq!(consume_action(false, true), CacheAction::Writeback);
        assert_eq!(consume_action(true, false), CacheAction::None);
        assert_eq!(consume_action(true, true), CacheAction::None);
        assert_eq!(consume_action(false, false), CacheAction::None);
    }
}
