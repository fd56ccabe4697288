//! Runtime payload memory pool.
//!
//! Stream buffer payloads are carved out of a fixed static zone rather than a
//! general-purpose heap: the zone lives in DMA-visible RAM, its size is known
//! at link time, and exhaustion is a clean allocation failure instead of an
//! out-of-memory abort. Allocation requests carry [`MemCaps`] capability bits
//! describing the memory attributes the caller needs; DMA-capable requests
//! are aligned up to a full data-cache line so maintenance operations on one
//! payload never clobber a neighbour.
//!
//! The zone is guarded by a critical section (allocation can race an ISR
//! tearing a pipeline down) and initialized lazily on first use.

use core::alloc::Layout;
use core::cell::{RefCell, UnsafeCell};
use core::mem::align_of;
use core::ptr::{self, NonNull};

use critical_section::Mutex;
use linked_list_allocator::Heap;

use crate::constants::{BUFFER_ZONE_BYTES, DCACHE_LINE_BYTES};

/// Memory capability bits carried by allocation requests.
pub type MemCaps = u32;

/// Plain cacheable RAM.
pub const CAPS_RAM: MemCaps = 1 << 0;

/// RAM reachable by the platform DMA engines.
pub const CAPS_DMA: MemCaps = 1 << 1;

/// Backing storage for a zone, aligned to the cache line so the first
/// allocation starts on a maintainable boundary.
#[repr(align(64))]
struct ZoneStorage<const N: usize>(UnsafeCell<[u8; N]>);

// SAFETY: the storage is only ever touched through the zone's heap, and the
// heap is only reachable inside a critical section.
unsafe impl<const N: usize> Sync for ZoneStorage<N> {}

/// A fixed memory zone backed by static storage.
///
/// The inner heap is built on first use so the zone itself can live in a
/// plain `static`.
pub struct Zone<const N: usize> {
    storage: ZoneStorage<N>,
    heap: Mutex<RefCell<Option<Heap>>>,
}

impl<const N: usize> Zone<N> {
    const fn new() -> Self {
        Zone {
            storage: ZoneStorage(UnsafeCell::new([0u8; N])),
            heap: Mutex::new(RefCell::new(None)),
        }
    }

    /// Allocate a block, or `None` when the zone cannot satisfy the layout.
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        critical_section::with(|cs| {
            let mut slot = self.heap.borrow_ref_mut(cs);
            let heap = slot.get_or_insert_with(|| {
                // First use: hand the static storage to the allocator.
                // SAFETY: the storage region is exclusively owned by this
                // heap and lives for the program's lifetime.
                unsafe { Heap::new(self.storage.0.get().cast(), N) }
            });
            heap.allocate_first_fit(layout).ok()
        })
    }

    /// Return a block previously handed out by [`Zone::alloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from an `alloc` call on this zone with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        critical_section::with(|cs| {
            let mut slot = self.heap.borrow_ref_mut(cs);
            // A pointer from alloc implies the heap exists.
            if let Some(heap) = slot.as_mut() {
                unsafe { heap.deallocate(ptr, layout) };
            }
        });
    }

    /// Bytes currently unallocated in the zone.
    pub fn free_bytes(&self) -> usize {
        critical_section::with(|cs| {
            match self.heap.borrow_ref(cs).as_ref() {
                None => N,
                Some(heap) => heap.free(),
            }
        })
    }
}

/// The zone all stream buffer payloads are allocated from.
pub static BUFFER_ZONE: Zone<BUFFER_ZONE_BYTES> = Zone::new();

/// Exclusively owned payload region carved from [`BUFFER_ZONE`].
///
/// The region is zero-filled on allocation and returned to its zone on drop.
pub struct PayloadBuf {
    ptr: NonNull<u8>,
    capacity: usize,
    layout: Layout,
}

// SAFETY: a PayloadBuf is the sole owner of its region; the raw pointer is
// only a handle to memory no other safe code aliases.
unsafe impl Send for PayloadBuf {}
// SAFETY: &PayloadBuf only exposes the base pointer and capacity; all byte
// access goes through raw pointers whose aliasing the caller governs.
unsafe impl Sync for PayloadBuf {}

impl PayloadBuf {
    /// Base address of the region.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Region size in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for PayloadBuf {
    fn drop(&mut self) {
        // SAFETY: ptr/layout are exactly what alloc_payload obtained, and
        // drop runs at most once.
        unsafe { BUFFER_ZONE.dealloc(self.ptr, self.layout) };
    }
}

/// Allocate a zero-filled payload region of `size` bytes.
///
/// DMA-capable requests are aligned to [`DCACHE_LINE_BYTES`]. Size validation
/// against the buffer maximum is the caller's job; this layer only reports
/// whether the zone can satisfy the request.
pub fn alloc_payload(caps: MemCaps, size: usize) -> Option<PayloadBuf> {
    let align = if caps & CAPS_DMA != 0 {
        DCACHE_LINE_BYTES
    } else {
        align_of::<u32>()
    };
    let layout = Layout::from_size_align(size, align).ok()?;
    let ptr = match BUFFER_ZONE.alloc(layout) {
        Some(ptr) => ptr,
        None => {
            warn!("alloc_payload: zone exhausted, size {} caps {}", size, caps);
            return None;
        }
    };
    // SAFETY: the zone just handed us `size` writable bytes at `ptr`.
    unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
    Some(PayloadBuf {
        ptr,
        capacity: size,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_zero_filled() {
        let buf = alloc_payload(CAPS_RAM, 256).unwrap();
        let bytes = unsafe { core::slice::from_raw_parts(buf.as_ptr(), 256) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn dma_payload_is_cache_line_aligned() {
        let buf = alloc_payload(CAPS_RAM | CAPS_DMA, 512).unwrap();
        assert_eq!(buf.as_ptr() as usize % DCACHE_LINE_BYTES, 0);
        assert_eq!(buf.capacity(), 512);
    }

    #[test]
    fn distinct_payloads_do_not_overlap() {
        let a = alloc_payload(CAPS_DMA, 128).unwrap();
        let b = alloc_payload(CAPS_DMA, 128).unwrap();
        let (a0, a1) = (a.as_ptr() as usize, a.as_ptr() as usize + 128);
        let (b0, b1) = (b.as_ptr() as usize, b.as_ptr() as usize + 128);
        assert!(a1 <= b0 || b1 <= a0);
    }
}
