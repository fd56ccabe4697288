//! Processing component descriptors.
//!
//! The buffer core sees a component as little more than two facts: whether it
//! moves samples over DMA, and which buffer edges it is attached to. The
//! stream format travels with the descriptor for the benefit of the
//! byte-marshalling layers up the stack; the buffer itself never inspects it.

use heapless::Vec;

use crate::constants::MAX_COMPONENT_LINKS;
use crate::pipeline::EdgeId;

/// Pipeline-assigned component handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompId(pub(crate) usize);

/// PCM stream format carried for the marshalling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamFormat {
    /// Sample rate in Hz.
    pub rate: u32,
    /// Interleaved channel count.
    pub channels: u8,
    /// Bits per sample as stored (16, 24-in-32 or 32).
    pub sample_bits: u8,
}

impl StreamFormat {
    pub const fn new(rate: u32, channels: u8, sample_bits: u8) -> Self {
        StreamFormat {
            rate,
            channels,
            sample_bits,
        }
    }

    /// Bytes per interleaved frame.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * (self.sample_bits as usize / 8)
    }
}

/// A processing component attached to the pipeline.
pub struct Component {
    /// Whether this component transfers samples via a DMA engine.
    pub uses_dma: bool,
    /// Stream format at this component's boundary.
    pub format: StreamFormat,
    /// Edges this component produces into.
    sink_edges: Vec<EdgeId, MAX_COMPONENT_LINKS>,
    /// Edges this component consumes from.
    source_edges: Vec<EdgeId, MAX_COMPONENT_LINKS>,
}

impl Component {
    pub(crate) fn new(uses_dma: bool, format: StreamFormat) -> Self {
        Component {
            uses_dma,
            format,
            sink_edges: Vec::new(),
            source_edges: Vec::new(),
        }
    }

    /// Edges this component feeds.
    pub fn sink_edges(&self) -> &[EdgeId] {
        &self.sink_edges
    }

    /// Edges feeding this component.
    pub fn source_edges(&self) -> &[EdgeId] {
        &self.source_edges
    }

    pub(crate) fn link_sink(&mut self, edge: EdgeId) -> Result<(), ()> {
        self.sink_edges.push(edge).map_err(|_| ())
    }

    pub(crate) fn link_source(&mut self, edge: EdgeId) -> Result<(), ()> {
        self.source_edges.push(edge).map_err(|_| ())
    }

    pub(crate) fn unlink(&mut self, edge: EdgeId) {
        if let Some(pos) = self.sink_edges.iter().position(|e| *e == edge) {
            self.sink_edges.remove(pos);
        }
        if let Some(pos) = self.source_edges.iter().position(|e| *e == edge) {
            self.source_edges.remove(pos);
        }
    }
}
