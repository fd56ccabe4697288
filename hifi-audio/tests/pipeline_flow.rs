//! End-to-end pipeline flows through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hifi_audio::{
    BufferDesc, BufferObserver, CompBuffer, Pipeline, StreamFormat, TransferEvent, CAPS_DMA,
    CAPS_RAM, NOTIFY_PRODUCE,
};

fn fmt() -> StreamFormat {
    StreamFormat::new(48_000, 2, 16)
}

/// DMA input -> codec -> DMA output, two buffer edges, a stream pushed
/// through both hops in chunks small enough to force repeated wrap-around.
#[test]
fn stream_crosses_two_edges_intact() {
    let mut p: Pipeline = Pipeline::new();
    let dma_in = p.add_component(true, fmt()).unwrap();
    let codec = p.add_component(false, fmt()).unwrap();
    let dma_out = p.add_component(true, fmt()).unwrap();

    let desc = BufferDesc::new(96, CAPS_RAM | CAPS_DMA);
    let in_edge = p.connect(dma_in, codec, &desc).unwrap();
    let out_edge = p.connect(codec, dma_out, &desc).unwrap();

    let source: Vec<u8> = (0..1000u32).map(|i| (i * 7 + 3) as u8).collect();
    let mut sunk: Vec<u8> = Vec::with_capacity(source.len());
    let mut fed = 0usize;

    while sunk.len() < source.len() {
        // "DMA engine" writes up to 40 bytes into the inbound edge
        let inb = p.buffer(in_edge).unwrap();
        let n = inb.free().min(40).min(source.len() - fed);
        if n > 0 {
            inb.copy_in(&source[fed..fed + n]);
            inb.produce(n);
            fed += n;
        }

        // "codec" moves whatever fits from inbound to outbound
        let (inb, outb) = (p.buffer(in_edge).unwrap(), p.buffer(out_edge).unwrap());
        let m = inb.available().min(outb.free());
        if m > 0 {
            let mut scratch = vec![0u8; m];
            inb.copy_out(&mut scratch);
            inb.consume(m);
            outb.copy_in(&scratch);
            outb.produce(m);
        }

        // "DMA engine" drains the outbound edge
        let outb = p.buffer(out_edge).unwrap();
        let k = outb.available();
        if k > 0 {
            let mut out = vec![0u8; k];
            outb.copy_out(&mut out);
            outb.consume(k);
            sunk.extend_from_slice(&out);
        }
    }

    assert_eq!(sunk, source);
    assert_eq!(p.buffer(in_edge).unwrap().available(), 0);
    assert_eq!(p.buffer(out_edge).unwrap().available(), 0);

    p.disconnect(in_edge);
    p.disconnect(out_edge);
    assert_eq!(p.edge_count(), 0);
}

/// An observer on the outbound edge sees every produced byte.
#[test]
fn observer_counts_produced_bytes() {
    struct Produced(AtomicUsize);
    impl BufferObserver for Produced {
        fn on_transfer(&self, event: TransferEvent, bytes: usize) {
            assert_eq!(event, TransferEvent::Produce);
            self.0.fetch_add(bytes, Ordering::Relaxed);
        }
    }
    static OBS: Produced = Produced(AtomicUsize::new(0));

    let mut p: Pipeline = Pipeline::new();
    let a = p.add_component(false, fmt()).unwrap();
    let b = p.add_component(false, fmt()).unwrap();
    let edge = p
        .connect(a, b, &BufferDesc::new(128, CAPS_RAM))
        .unwrap();
    p.buffer_mut(edge)
        .unwrap()
        .set_observer(&OBS, NOTIFY_PRODUCE);

    for _ in 0..5 {
        let buf = p.buffer(edge).unwrap();
        buf.produce(20);
        buf.consume(20);
    }
    assert_eq!(OBS.0.load(Ordering::Relaxed), 100);
}

/// Producer and consumer hammer one buffer from different threads; the guard
/// keeps the accounting exact and the byte stream ordered.
#[test]
fn concurrent_producer_consumer_stay_consistent() {
    const TOTAL: usize = 64 * 1024;
    const CHUNK: usize = 37; // deliberately not a divisor of the capacity

    let buf = Arc::new(CompBuffer::new(0, &BufferDesc::new(256, CAPS_RAM | CAPS_DMA)).unwrap());

    let producer = {
        let buf = Arc::clone(&buf);
        std::thread::spawn(move || {
            let mut sent = 0usize;
            let mut chunk = [0u8; CHUNK];
            while sent < TOTAL {
                let n = CHUNK.min(TOTAL - sent);
                for (i, b) in chunk[..n].iter_mut().enumerate() {
                    *b = ((sent + i) % 251) as u8;
                }
                while buf.free() < n {
                    std::thread::yield_now();
                }
                buf.copy_in(&chunk[..n]);
                buf.produce(n);
                sent += n;
            }
        })
    };

    let consumer = {
        let buf = Arc::clone(&buf);
        std::thread::spawn(move || {
            let mut seen = 0usize;
            let mut out = [0u8; 256];
            while seen < TOTAL {
                let n = buf.available().min(TOTAL - seen);
                if n == 0 {
                    std::thread::yield_now();
                    continue;
                }
                buf.copy_out(&mut out[..n]);
                buf.consume(n);
                for (i, &b) in out[..n].iter().enumerate() {
                    assert_eq!(b, ((seen + i) % 251) as u8, "byte {} corrupted", seen + i);
                }
                seen += n;
            }
        })
    };

    producer.join().unwrap();
    consumer.join().unwrap();

    assert_eq!(buf.available(), 0);
    assert_eq!(buf.free(), 256);
    assert!(buf.transfer_done());
}
