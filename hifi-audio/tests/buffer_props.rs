//! Property tests for the buffer accounting invariants.
//!
//! A shadow model tracks what the cursors and availability must be after
//! every contract-respecting produce/consume sequence; the buffer has to
//! agree after each call.

use hifi_audio::{BufferDesc, CompBuffer, CAPS_DMA, CAPS_RAM};
use proptest::collection::vec;
use proptest::prelude::*;

fn buffer(capacity: usize) -> CompBuffer {
    CompBuffer::new(0, &BufferDesc::new(capacity, CAPS_RAM | CAPS_DMA)).unwrap()
}

proptest! {
    /// available + free == capacity and both cursors stay inside the payload
    /// after every call, and they match the shadow model exactly.
    #[test]
    fn accounting_matches_model(
        capacity in 1usize..=1024,
        ops in vec((any::<bool>(), 0.0f64..=1.0), 1..200),
    ) {
        let buf = buffer(capacity);
        let mut avail = 0usize;
        let mut w = 0usize;
        let mut r = 0usize;

        for (is_produce, frac) in ops {
            if is_produce {
                let n = ((capacity - avail) as f64 * frac) as usize;
                buf.produce(n);
                if n > 0 {
                    avail += n;
                    w = (w + n) % capacity;
                }
            } else {
                let n = (avail as f64 * frac) as usize;
                buf.consume(n);
                if n > 0 {
                    avail -= n;
                    r = (r + n) % capacity;
                }
            }

            prop_assert_eq!(buf.available() + buf.free(), capacity);
            prop_assert!(buf.write_offset() < capacity);
            prop_assert!(buf.read_offset() < capacity);
            prop_assert_eq!(buf.available(), avail);
            prop_assert_eq!(buf.write_offset(), w);
            prop_assert_eq!(buf.read_offset(), r);
        }
    }

    /// Zero-byte operations never move cursors or change accounting.
    #[test]
    fn zero_byte_ops_are_idempotent(
        capacity in 1usize..=512,
        fill_frac in 0.0f64..=1.0,
    ) {
        let buf = buffer(capacity);
        let n = (capacity as f64 * fill_frac) as usize;
        buf.produce(n);

        let snapshot = (
            buf.available(),
            buf.free(),
            buf.write_offset(),
            buf.read_offset(),
        );
        buf.produce(0);
        buf.consume(0);
        buf.produce(0);
        prop_assert_eq!(
            (buf.available(), buf.free(), buf.write_offset(), buf.read_offset()),
            snapshot
        );
    }

    /// Filling to exactly capacity is "full", draining it again is "empty",
    /// with equal cursors in both end states.
    #[test]
    fn full_and_empty_tie_breaks(capacity in 1usize..=1024) {
        let buf = buffer(capacity);

        buf.produce(capacity);
        prop_assert_eq!(buf.available(), capacity);
        prop_assert_eq!(buf.free(), 0);
        prop_assert_eq!(buf.write_offset(), buf.read_offset());

        buf.consume(capacity);
        prop_assert_eq!(buf.available(), 0);
        prop_assert_eq!(buf.free(), capacity);
        prop_assert_eq!(buf.write_offset(), buf.read_offset());
    }

    /// Bytes pushed through the buffer in arbitrary chunk sizes come out
    /// unchanged and in order, across arbitrarily many wrap-arounds.
    #[test]
    fn byte_stream_survives_transit(
        capacity in 8usize..=256,
        data in vec(any::<u8>(), 1..2048),
        chunk_fracs in vec(0.01f64..=1.0, 1..64),
    ) {
        let buf = buffer(capacity);
        let mut fed = 0usize;
        let mut drained: Vec<u8> = Vec::with_capacity(data.len());
        let mut chunks = chunk_fracs.iter().cycle();

        while drained.len() < data.len() {
            // feed a chunk bounded by free space and remaining input
            let want = ((capacity as f64 * chunks.next().unwrap()).ceil() as usize)
                .min(buf.free())
                .min(data.len() - fed);
            if want > 0 {
                buf.copy_in(&data[fed..fed + want]);
                buf.produce(want);
                fed += want;
            }

            // drain everything currently available
            let take = buf.available();
            if take > 0 {
                let mut out = vec![0u8; take];
                buf.copy_out(&mut out);
                buf.consume(take);
                drained.extend_from_slice(&out);
            }
        }

        prop_assert_eq!(drained, data);
    }
}
