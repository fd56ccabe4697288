//! Transfer notification hook.
//!
//! A buffer can carry one observer that is told, synchronously, how many
//! bytes each produce or consume moved. Event-driven sinks use this to react
//! to fresh data without polling `available`.
//!
//! The observer runs **inside the buffer's critical section**: it must be
//! fast, must not block, and must not call back into operations that mutate
//! the same buffer. Reading `available`/`free` is fine.

/// Which transfer just completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferEvent {
    Produce,
    Consume,
}

/// Subscription bit: notify on produce.
pub const NOTIFY_PRODUCE: u8 = 1 << 0;

/// Subscription bit: notify on consume.
pub const NOTIFY_CONSUME: u8 = 1 << 1;

/// Synchronous transfer observer.
pub trait BufferObserver: Sync {
    /// Called with the byte count of the transfer that just completed.
    fn on_transfer(&self, event: TransferEvent, bytes: usize);
}

pub(crate) fn event_bit(event: TransferEvent) -> u8 {
    match event {
        TransferEvent::Produce => NOTIFY_PRODUCE,
        TransferEvent::Consume => NOTIFY_CONSUME,
    }
}
