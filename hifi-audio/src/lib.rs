//! # hifi-audio
//!
//! `no_std` inter-component stream buffers for audio pipelines on HiFi-class
//! DSP cores. Processing components (codecs, post-processors, mixers) are
//! joined by circular byte buffers; the upstream side writes at the write
//! cursor and calls `produce`, the downstream side reads at the read cursor
//! and calls `consume`, and the buffer keeps the cursor arithmetic, the
//! `available`/`free` accounting and the cache coherency of DMA-fed edges
//! correct under hard real-time deadlines.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`heap`] | Static payload zone, capability-flagged allocation |
//! | Core | [`buffer`] | Circular buffer state machine, produce/consume |
//! | Coherency | [`cache`] | DMA cache-maintenance policy + platform backend |
//! | Events | [`observer`] | Synchronous transfer notification hook |
//! | Topology | [`component`] / [`pipeline`] | Descriptors and index-based adjacency |
//!
//! ## Quick start
//!
//! ```ignore
//! use hifi_audio::{BufferDesc, Pipeline, StreamFormat, CAPS_DMA, CAPS_RAM};
//!
//! let mut pipeline: Pipeline = Pipeline::new();
//! let dma_in = pipeline.add_component(true, StreamFormat::new(48_000, 2, 16))?;
//! let codec = pipeline.add_component(false, StreamFormat::new(48_000, 2, 16))?;
//! let edge = pipeline.connect(dma_in, codec, &BufferDesc::new(4096, CAPS_RAM | CAPS_DMA))?;
//!
//! // DMA completion ISR, after the engine wrote n bytes:
//! pipeline.buffer(edge).unwrap().produce(n);
//!
//! // Codec task, after reading m bytes:
//! pipeline.buffer(edge).unwrap().consume(m);
//! ```
//!
//! ## Concurrency
//!
//! One producer and one consumer per buffer, possibly in different execution
//! contexts (task vs. ISR). Compound state updates run inside a
//! `critical-section` guard; `available`/`free`/`transfer_done` are single
//! atomic loads from any context. Neither operation ever blocks.
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `defmt` | no | Trace/warn logging via `defmt` |

#![no_std]

#[macro_use]
pub(crate) mod fmt;

pub mod buffer;
pub mod cache;
pub mod component;
pub mod constants;
pub mod heap;
pub mod observer;
pub mod pipeline;

pub use buffer::{BufferDesc, BufferError, CompBuffer};
pub use cache::{CacheAction, CacheOps, Coherent};
pub use component::{CompId, Component, StreamFormat};
pub use heap::{PayloadBuf, CAPS_DMA, CAPS_RAM};
pub use observer::{BufferObserver, TransferEvent, NOTIFY_CONSUME, NOTIFY_PRODUCE};
pub use pipeline::{EdgeId, Pipeline, PipelineError};
