/// Largest payload a single stream buffer may request, in bytes.
pub const MAX_BUFFER_BYTES: usize = 64 * 1024;

/// Total size of the static payload zone all stream buffers are carved from.
pub const BUFFER_ZONE_BYTES: usize = 256 * 1024;

/// Data-cache line size of the target DSP core, in bytes.
///
/// DMA-capable payload regions are aligned to this so cache maintenance over
/// a buffer never touches lines shared with unrelated data.
pub const DCACHE_LINE_BYTES: usize = 64;

/// Maximum number of components a pipeline can hold.
pub const MAX_PIPELINE_COMPONENTS: usize = 16;

/// Maximum number of buffer edges a pipeline can hold.
pub const MAX_PIPELINE_EDGES: usize = 16;

/// Maximum number of edges attached to one side of a single component.
pub const MAX_COMPONENT_LINKS: usize = 4;
