//! Passthrough pipeline — simplest possible buffer edge demo.
//!
//! Simulates one second of 48 kHz stereo S16 audio flowing from a DMA-fed
//! input, through a processing component, to a DMA-driven output:
//!
//! ```text
//!   dma_in ──edge 0──► codec ──edge 1──► dma_out
//! ```
//!
//! Each loop iteration plays one "DMA period": the input engine deposits a
//! period of samples and produces, the codec shuttles whatever fits across
//! to the output edge, and the output engine consumes its period. Run with
//! `cargo run -p hifi-audio-demos --bin passthrough`.

use hifi_audio::{BufferDesc, Pipeline, StreamFormat, CAPS_DMA, CAPS_RAM};

/// One DMA period: 48 stereo S16 frames.
const PERIOD_BYTES: usize = 48 * 4;
const SECONDS: usize = 1;
const RATE: u32 = 48_000;

fn main() {
    let format = StreamFormat::new(RATE, 2, 16);
    let mut pipeline: Pipeline = Pipeline::new();
    let dma_in = pipeline.add_component(true, format).unwrap();
    let codec = pipeline.add_component(false, format).unwrap();
    let dma_out = pipeline.add_component(true, format).unwrap();

    // Four periods of headroom per edge, cache-line placed for DMA.
    let desc = BufferDesc::new(4 * PERIOD_BYTES, CAPS_RAM | CAPS_DMA);
    let in_edge = pipeline.connect(dma_in, codec, &desc).unwrap();
    let out_edge = pipeline.connect(codec, dma_out, &desc).unwrap();

    let total = SECONDS * RATE as usize * format.frame_bytes();
    let mut fed = 0usize;
    let mut drained = 0usize;
    let mut phase = 0u32;

    while drained < total {
        // DMA input period: synth a ramp so corruption would be visible.
        let inb = pipeline.buffer(in_edge).unwrap();
        let n = inb.free().min(PERIOD_BYTES).min(total - fed);
        if n > 0 {
            let period: Vec<u8> = (0..n).map(|i| (phase as usize + i) as u8).collect();
            inb.copy_in(&period);
            inb.produce(n);
            fed += n;
            phase = phase.wrapping_add(n as u32);
        }

        // Codec pass: move available input into free output space.
        let (inb, outb) = (
            pipeline.buffer(in_edge).unwrap(),
            pipeline.buffer(out_edge).unwrap(),
        );
        let m = inb.available().min(outb.free());
        if m > 0 {
            let mut scratch = vec![0u8; m];
            inb.copy_out(&mut scratch);
            inb.consume(m);
            outb.copy_in(&scratch);
            outb.produce(m);
        }

        // DMA output period.
        let outb = pipeline.buffer(out_edge).unwrap();
        let k = outb.available().min(PERIOD_BYTES);
        if k > 0 {
            let mut sink = vec![0u8; k];
            outb.copy_out(&mut sink);
            outb.consume(k);
            for (i, &b) in sink.iter().enumerate() {
                assert_eq!(b, ((drained + i) % 256) as u8, "stream corrupted");
            }
            drained += k;
        }
    }

    println!(
        "passthrough: {} bytes through 2 edges, in-flight now {}+{}",
        drained,
        pipeline.buffer(in_edge).unwrap().available(),
        pipeline.buffer(out_edge).unwrap().available()
    );

    pipeline.disconnect(in_edge);
    pipeline.disconnect(out_edge);
    assert_eq!(pipeline.edge_count(), 0);
    println!("passthrough: edges torn down cleanly");
}
