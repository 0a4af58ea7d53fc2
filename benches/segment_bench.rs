use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use cubebot::config::default_color_table;
use cubebot::hw::Frame;
use cubebot::sensing::color::ColorSegmenter;

fn segment_detect_bench(c: &mut Criterion) {
    let segmenter = ColorSegmenter::new(default_color_table(), 0.25, 50);

    // 640x480 gray frame with two colored blocks in the scan band.
    let mut frame = Frame::solid(640, 480, [120, 120, 120]);
    frame.paint_block(100, 180, 100, 200, [0, 255, 0]);
    frame.paint_block(400, 520, 100, 200, [0, 0, 255]);

    c.bench_function("segment_detect_640x480", |b| {
        b.iter(|| black_box(segmenter.detect(black_box(&frame), false)))
    });
}

criterion_group!(benches, segment_detect_bench);
criterion_main!(benches);
