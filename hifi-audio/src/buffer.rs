//! Inter-component circular stream buffer.
//!
//! A [`CompBuffer`] is the edge between two processing components: the
//! upstream side writes sample bytes at the write cursor and calls
//! [`produce`](CompBuffer::produce); the downstream side reads at the read
//! cursor and calls [`consume`](CompBuffer::consume). The buffer itself never
//! moves data — it tracks cursors, the derived `available`/`free` byte
//! counts, and the cache maintenance each transfer needs when one side is
//! DMA-connected.
//!
//! ## Concurrency contract
//!
//! - Exactly ONE context produces into a buffer and exactly ONE context
//!   consumes from it. They may be different contexts (a pipeline task and a
//!   DMA-completion ISR).
//! - All compound cursor/accounting updates run inside a critical section,
//!   so produce and consume never interleave half-done state.
//! - `available`, `free` and `transfer_done` are single atomic loads and may
//!   be read from any context without taking the guard.
//! - The producer only writes payload bytes ahead of the write cursor, the
//!   consumer only reads behind it; the payload bytes themselves are not
//!   guarded.
//!
//! ## Full/empty tie-break
//!
//! Cursor equality is ambiguous between "completely empty" and "completely
//! full". Availability is therefore recomputed immediately after every cursor
//! move: equality reached by a produce means full, equality reached by a
//! consume means empty. It is never re-derived from the cursors alone.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::cache::{self, CacheAction, CacheOps, Coherent};
use crate::constants::MAX_BUFFER_BYTES;
use crate::heap::{self, MemCaps, PayloadBuf};
use crate::observer::{event_bit, BufferObserver, TransferEvent};

/// Creation descriptor for a buffer edge.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferDesc {
    /// Requested payload capacity in bytes.
    pub size: usize,
    /// Memory capability bits for payload placement (see [`crate::heap`]).
    pub caps: MemCaps,
}

impl BufferDesc {
    pub const fn new(size: usize, caps: MemCaps) -> Self {
        BufferDesc { size, caps }
    }
}

/// Buffer creation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferError {
    /// Requested capacity was zero or above [`MAX_BUFFER_BYTES`].
    InvalidSize,
    /// The payload zone could not satisfy the request.
    PayloadAlloc,
}

struct ObserverEntry {
    hook: &'static dyn BufferObserver,
    mask: u8,
}

/// Circular stream buffer between one producer and one consumer.
///
/// Generic over the platform cache backend; [`Coherent`] (the default) is
/// correct wherever DMA is hardware-coherent, and for host builds.
pub struct CompBuffer<C: CacheOps = Coherent> {
    id: u32,
    payload: PayloadBuf,
    /// Write cursor as a byte offset into the payload, always `< capacity`.
    w_off: AtomicUsize,
    /// Read cursor as a byte offset into the payload, always `< capacity`.
    r_off: AtomicUsize,
    /// Bytes of valid unread data. Cached so readers stay O(1).
    avail: AtomicUsize,
    /// `capacity - avail`, cached alongside.
    free: AtomicUsize,
    last_produced: AtomicUsize,
    last_consumed: AtomicUsize,
    /// Read cursor snapshot taken by the most recent consume.
    last_r_off: AtomicUsize,
    /// True once a consume has completed since the last produce.
    transfer_done: AtomicBool,
    source_dma: bool,
    sink_dma: bool,
    observer: Option<ObserverEntry>,
    cache: C,
}

impl CompBuffer<Coherent> {
    /// Create a buffer with the coherent (no-op) cache backend.
    pub fn new(id: u32, desc: &BufferDesc) -> Result<Self, BufferError> {
        Self::with_cache(id, desc, Coherent)
    }
}

impl<C: CacheOps> CompBuffer<C> {
    /// Create a buffer with an explicit cache backend.
    ///
    /// The payload is allocated from the buffer zone and zero-filled; both
    /// cursors start at the payload base with `available == 0`.
    pub fn with_cache(id: u32, desc: &BufferDesc, cache: C) -> Result<Self, BufferError> {
        if desc.size == 0 || desc.size > MAX_BUFFER_BYTES {
            warn!("buffer new: invalid size {}", desc.size);
            return Err(BufferError::InvalidSize);
        }
        let payload = heap::alloc_payload(desc.caps, desc.size).ok_or(BufferError::PayloadAlloc)?;
        trace!("buffer new: id {} size {} caps {}", id, desc.size, desc.caps);
        Ok(CompBuffer {
            id,
            payload,
            w_off: AtomicUsize::new(0),
            r_off: AtomicUsize::new(0),
            avail: AtomicUsize::new(0),
            free: AtomicUsize::new(desc.size),
            last_produced: AtomicUsize::new(0),
            last_consumed: AtomicUsize::new(0),
            last_r_off: AtomicUsize::new(0),
            transfer_done: AtomicBool::new(false),
            source_dma: false,
            sink_dma: false,
            observer: None,
            cache,
        })
    }

    /// Record the DMA capability of the attached endpoints.
    ///
    /// Set once at pipeline-preparation time, before the buffer is shared
    /// across contexts; read on every transfer.
    pub fn set_endpoints(&mut self, source_dma: bool, sink_dma: bool) {
        self.source_dma = source_dma;
        self.sink_dma = sink_dma;
    }

    /// Register a transfer observer. `mask` is a combination of
    /// [`crate::observer::NOTIFY_PRODUCE`] and
    /// [`crate::observer::NOTIFY_CONSUME`].
    pub fn set_observer(&mut self, hook: &'static dyn BufferObserver, mask: u8) {
        self.observer = Some(ObserverEntry { hook, mask });
    }

    /// Pipeline-assigned edge id, carried for tracing.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Payload capacity in bytes. Immutable after creation.
    pub fn capacity(&self) -> usize {
        self.payload.capacity()
    }

    /// Bytes of valid unread data.
    pub fn available(&self) -> usize {
        self.avail.load(Ordering::Acquire)
    }

    /// Bytes of free space.
    pub fn free(&self) -> usize {
        self.free.load(Ordering::Acquire)
    }

    /// True once a consume has completed since the last produce.
    pub fn transfer_done(&self) -> bool {
        self.transfer_done.load(Ordering::Acquire)
    }

    /// Current write cursor as a byte offset from the payload base.
    pub fn write_offset(&self) -> usize {
        self.w_off.load(Ordering::Acquire)
    }

    /// Current read cursor as a byte offset from the payload base.
    pub fn read_offset(&self) -> usize {
        self.r_off.load(Ordering::Acquire)
    }

    /// Payload base address.
    pub fn base_ptr(&self) -> *mut u8 {
        self.payload.as_ptr()
    }

    /// Raw write cursor. The producer writes here before calling `produce`.
    pub fn write_ptr(&self) -> *mut u8 {
        // SAFETY: w_off < capacity by invariant.
        unsafe { self.payload.as_ptr().add(self.write_offset()) }
    }

    /// Raw read cursor. The consumer reads here before calling `consume`.
    pub fn read_ptr(&self) -> *const u8 {
        // SAFETY: r_off < capacity by invariant.
        unsafe { self.payload.as_ptr().add(self.read_offset()) }
    }

    /// Signal that `bytes` have been written at the write cursor.
    ///
    /// Dispatches cache maintenance over the span just written (split at the
    /// wrap boundary if needed), advances the write cursor, recomputes
    /// `available`/`free` with the full-on-equality tie-break, records the
    /// transfer and fires a produce-subscribed observer.
    ///
    /// Zero bytes is a successful no-op: no cursor motion, no observer.
    ///
    /// # Panics
    ///
    /// If `bytes` exceeds `free` — producing past the read cursor would
    /// silently corrupt the stream, so the contract violation fails loudly.
    pub fn produce(&self, bytes: usize) {
        if bytes == 0 {
            trace!("produce: id {} no bytes", self.id);
            return;
        }

        critical_section::with(|_cs| {
            let capacity = self.payload.capacity();
            let free = self.free.load(Ordering::Relaxed);
            assert!(bytes <= free, "produce overrun: {} bytes, {} free", bytes, free);

            let w = self.w_off.load(Ordering::Relaxed);
            let (head, tail) = split_span(w, bytes, capacity);

            // Coherency must cover exactly the bytes just written, so it
            // runs before the cursor moves.
            let base = self.payload.as_ptr();
            match cache::produce_action(self.source_dma, self.sink_dma) {
                CacheAction::Invalidate => {
                    // SAFETY: [w, w + head) and [0, tail) lie inside the payload.
                    self.cache.invalidate_region(unsafe { base.add(w) }, head);
                    if tail > 0 {
                        self.cache.invalidate_region(base, tail);
                    }
                }
                CacheAction::Writeback => {
                    // SAFETY: as above.
                    self.cache.writeback_region(unsafe { base.add(w) }, head);
                    if tail > 0 {
                        self.cache.writeback_region(base, tail);
                    }
                }
                CacheAction::None => {}
            }

            let mut w2 = w + bytes;
            if w2 >= capacity {
                w2 -= capacity;
            }

            let r = self.r_off.load(Ordering::Relaxed);
            let avail = if r < w2 {
                w2 - r
            } else if r == w2 {
                capacity // just became full
            } else {
                capacity - (r - w2)
            };

            self.w_off.store(w2, Ordering::Release);
            self.avail.store(avail, Ordering::Release);
            self.free.store(capacity - avail, Ordering::Release);
            self.last_produced.store(bytes, Ordering::Relaxed);
            self.transfer_done.store(false, Ordering::Release);

            self.notify(TransferEvent::Produce, bytes);
        });

        trace!(
            "produce: id {} bytes {} avail {} free {}",
            self.id,
            bytes,
            self.available(),
            self.free(),
        );
    }

    /// Signal that `bytes` have been read at the read cursor.
    ///
    /// Advances the read cursor, recomputes `available`/`free` with the
    /// empty-on-equality tie-break, pushes trailing writes through for a DMA
    /// sink, records the transfer snapshot and fires a consume-subscribed
    /// observer.
    ///
    /// Zero bytes takes a guard-free fast path: the read-cursor snapshot and
    /// `transfer_done` are recorded, nothing else changes.
    ///
    /// # Panics
    ///
    /// If `bytes` exceeds `available` (contract violation, see `produce`).
    pub fn consume(&self, bytes: usize) {
        if bytes == 0 {
            trace!("consume: id {} no bytes", self.id);
            self.last_consumed.store(0, Ordering::Relaxed);
            self.last_r_off
                .store(self.r_off.load(Ordering::Acquire), Ordering::Relaxed);
            self.transfer_done.store(true, Ordering::Release);
            return;
        }

        critical_section::with(|_cs| {
            let capacity = self.payload.capacity();
            let avail = self.avail.load(Ordering::Relaxed);
            assert!(
                bytes <= avail,
                "consume overrun: {} bytes, {} available",
                bytes,
                avail
            );

            let r = self.r_off.load(Ordering::Relaxed);
            let mut r2 = r + bytes;
            if r2 >= capacity {
                r2 -= capacity;
            }

            let w = self.w_off.load(Ordering::Relaxed);
            let avail = if r2 < w {
                w - r2
            } else if r2 == w {
                0 // just became empty
            } else {
                capacity - (r2 - w)
            };

            self.r_off.store(r2, Ordering::Release);
            self.avail.store(avail, Ordering::Release);
            self.free.store(capacity - avail, Ordering::Release);

            // Push any trailing producer writes through to RAM for a DMA
            // sink, over the contiguous run at the new read cursor.
            if cache::consume_action(self.source_dma, self.sink_dma) == CacheAction::Writeback {
                let len = bytes.min(capacity - r2);
                // SAFETY: [r2, r2 + len) lies inside the payload.
                self.cache
                    .writeback_region(unsafe { self.payload.as_ptr().add(r2) }, len);
            }

            self.last_consumed.store(bytes, Ordering::Relaxed);
            self.transfer_done.store(true, Ordering::Release);
            self.last_r_off.store(r2, Ordering::Relaxed);

            self.notify(TransferEvent::Consume, bytes);
        });

        trace!(
            "consume: id {} bytes {} avail {} free {}",
            self.id,
            bytes,
            self.available(),
            self.free(),
        );
    }

    /// Re-arm the unconsumed tail of the last transfer.
    ///
    /// Recovery hook for a transfer the consumer reported short: recomputes
    /// the outstanding byte count (`last_produced - last_consumed`), rewinds
    /// the write cursor to the consumer's last position and fires the produce
    /// observer with the outstanding count so the producer-side engine can
    /// redo the transfer. Deliberately narrow: no cache maintenance and no
    /// availability recomputation happen here.
    pub fn retransmit(&self) {
        critical_section::with(|_cs| {
            let produced = self.last_produced.load(Ordering::Relaxed);
            let consumed = self.last_consumed.load(Ordering::Relaxed);
            debug_assert!(consumed <= produced, "retransmit with consumed > produced");
            let bytes = produced.saturating_sub(consumed);

            trace!(
                "retransmit: id {} bytes {} last consumed {}",
                self.id,
                bytes,
                consumed,
            );

            self.w_off
                .store(self.last_r_off.load(Ordering::Relaxed), Ordering::Release);
            self.last_produced.store(bytes, Ordering::Relaxed);
            self.transfer_done.store(false, Ordering::Release);

            self.notify(TransferEvent::Produce, bytes);
        });
    }

    /// Copy `data` into the payload at the write cursor, splitting at the
    /// wrap boundary. Does not advance the cursor; the producer follows up
    /// with [`produce`](Self::produce).
    ///
    /// # Panics
    ///
    /// If `data.len()` exceeds `free`.
    pub fn copy_in(&self, data: &[u8]) {
        let capacity = self.payload.capacity();
        assert!(data.len() <= self.free(), "copy_in past free space");
        let w = self.w_off.load(Ordering::Acquire);
        let (head, tail) = split_span(w, data.len(), capacity);
        // SAFETY: the producer owns [w, w + len) by the one-producer
        // contract; both segments lie inside the payload.
        unsafe {
            let base = self.payload.as_ptr();
            core::ptr::copy_nonoverlapping(data.as_ptr(), base.add(w), head);
            if tail > 0 {
                core::ptr::copy_nonoverlapping(data.as_ptr().add(head), base, tail);
            }
        }
    }

    /// Copy bytes out of the payload at the read cursor, splitting at the
    /// wrap boundary. Does not advance the cursor; the consumer follows up
    /// with [`consume`](Self::consume).
    ///
    /// # Panics
    ///
    /// If `out.len()` exceeds `available`.
    pub fn copy_out(&self, out: &mut [u8]) {
        let capacity = self.payload.capacity();
        assert!(out.len() <= self.available(), "copy_out past available data");
        let r = self.r_off.load(Ordering::Acquire);
        let (head, tail) = split_span(r, out.len(), capacity);
        // SAFETY: the consumer owns [r, r + len) by the one-consumer
        // contract; both segments lie inside the payload.
        unsafe {
            let base = self.payload.as_ptr();
            core::ptr::copy_nonoverlapping(base.add(r), out.as_mut_ptr(), head);
            if tail > 0 {
                core::ptr::copy_nonoverlapping(base, out.as_mut_ptr().add(head), tail);
            }
        }
    }

    fn notify(&self, event: TransferEvent, bytes: usize) {
        if let Some(entry) = &self.observer {
            if entry.mask & event_bit(event) != 0 {
                entry.hook.on_transfer(event, bytes);
            }
        }
    }
}

impl<C: CacheOps> Drop for CompBuffer<C> {
    fn drop(&mut self) {
        trace!("buffer free: id {}", self.id);
    }
}

/// Split the span `[off, off + len)` at the wrap boundary; returns the head
/// length up to `capacity` and the tail length wrapping to the base.
fn split_span(off: usize, len: usize, capacity: usize) -> (usize, usize) {
    if off + len > capacity {
        let head = capacity - off;
        (head, len - head)
    } else {
        (len, 0)
    }
}
