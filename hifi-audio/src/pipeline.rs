//! Pipeline topology: components and the buffer edges between them.
//!
//! The pipeline owns every component and buffer by value in fixed-capacity
//! tables; edges are referenced by index ([`EdgeId`]) instead of woven
//! through intrusive links, so ownership stays unambiguous. Connecting two
//! components creates the buffer edge, stamps it with both endpoints' DMA
//! capability and registers it in the source's sink-list and the sink's
//! source-list; disconnecting detaches (idempotently) and drops the buffer,
//! which returns its payload to the zone.
//!
//! Mutating the topology takes `&mut self`, which statically rules out
//! tearing an edge down while a produce or consume is in flight through a
//! shared `&Pipeline`.

use heapless::Vec;

use crate::buffer::{BufferDesc, BufferError, CompBuffer};
use crate::cache::{CacheOps, Coherent};
use crate::component::{CompId, Component, StreamFormat};
use crate::constants::{MAX_PIPELINE_COMPONENTS, MAX_PIPELINE_EDGES};

/// Pipeline-assigned buffer edge handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeId(pub(crate) usize);

/// Topology mutation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineError {
    /// A component id did not refer to a live component.
    UnknownComponent,
    /// The component table is full.
    ComponentTableFull,
    /// The edge table is full; the buffer created for the edge was rolled
    /// back and its payload released.
    EdgeTableFull,
    /// One endpoint's adjacency list is full; likewise rolled back.
    AdjacencyFull,
    /// Buffer creation itself failed.
    Buffer(BufferError),
}

impl From<BufferError> for PipelineError {
    fn from(e: BufferError) -> Self {
        PipelineError::Buffer(e)
    }
}

/// A pipeline topology of components joined by stream buffers.
pub struct Pipeline<C: CacheOps + Default = Coherent> {
    components: Vec<Component, MAX_PIPELINE_COMPONENTS>,
    edges: Vec<Option<CompBuffer<C>>, MAX_PIPELINE_EDGES>,
}

impl<C: CacheOps + Default> Pipeline<C> {
    pub const fn new() -> Self {
        Pipeline {
            components: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Register a processing component.
    pub fn add_component(
        &mut self,
        uses_dma: bool,
        format: StreamFormat,
    ) -> Result<CompId, PipelineError> {
        let id = CompId(self.components.len());
        self.components
            .push(Component::new(uses_dma, format))
            .map_err(|_| PipelineError::ComponentTableFull)?;
        Ok(id)
    }

    /// Create a buffer edge from `source` to `sink`.
    ///
    /// Any partially-registered state is rolled back on failure: a buffer
    /// whose edge or adjacency registration fails is dropped here, releasing
    /// its payload.
    pub fn connect(
        &mut self,
        source: CompId,
        sink: CompId,
        desc: &BufferDesc,
    ) -> Result<EdgeId, PipelineError> {
        let source_dma = self
            .components
            .get(source.0)
            .ok_or(PipelineError::UnknownComponent)?
            .uses_dma;
        let sink_dma = self
            .components
            .get(sink.0)
            .ok_or(PipelineError::UnknownComponent)?
            .uses_dma;

        // Reuse the slot of a torn-down edge before growing the table.
        let slot = self.edges.iter().position(|s| s.is_none());
        let edge = EdgeId(slot.unwrap_or(self.edges.len()));
        let mut buffer = CompBuffer::with_cache(edge.0 as u32, desc, C::default())?;
        buffer.set_endpoints(source_dma, sink_dma);

        match slot {
            Some(i) => self.edges[i] = Some(buffer),
            None => self
                .edges
                .push(Some(buffer))
                .map_err(|_| PipelineError::EdgeTableFull)?,
        }

        if self.components[source.0].link_sink(edge).is_err() {
            self.edges[edge.0] = None;
            return Err(PipelineError::AdjacencyFull);
        }
        if self.components[sink.0].link_source(edge).is_err() {
            self.components[source.0].unlink(edge);
            self.edges[edge.0] = None;
            return Err(PipelineError::AdjacencyFull);
        }

        trace!("pipeline connect: edge {} size {}", edge.0, desc.size);
        Ok(edge)
    }

    /// Tear down a buffer edge: detach it from both adjacency lists and drop
    /// it, releasing the payload. Disconnecting an already-torn-down (or
    /// unknown) edge is a no-op.
    pub fn disconnect(&mut self, edge: EdgeId) {
        for component in self.components.iter_mut() {
            component.unlink(edge);
        }
        if let Some(slot) = self.edges.get_mut(edge.0) {
            if slot.take().is_some() {
                trace!("pipeline disconnect: edge {}", edge.0);
            }
        }
    }

    /// The buffer behind an edge, if the edge is still connected.
    pub fn buffer(&self, edge: EdgeId) -> Option<&CompBuffer<C>> {
        self.edges.get(edge.0).and_then(|slot| slot.as_ref())
    }

    /// Mutable access to an edge's buffer, for preparation-time
    /// configuration (observer registration).
    pub fn buffer_mut(&mut self, edge: EdgeId) -> Option<&mut CompBuffer<C>> {
        self.edges.get_mut(edge.0).and_then(|slot| slot.as_mut())
    }

    /// A registered component.
    pub fn component(&self, id: CompId) -> Option<&Component> {
        self.components.get(id.0)
    }

    /// Number of live (connected) edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of registered components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl<C: CacheOps + Default> Default for Pipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}
