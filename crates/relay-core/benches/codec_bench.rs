//! Criterion benchmarks for the relay-core text codec.
//!
//! The relay sits on the interactive path between the user's keyboard and
//! the peer's HID output, so encoding must stay negligible next to the BLE
//! connection interval (7.5ms at best).
//!
//! Run with:
//! ```bash
//! cargo bench --package relay-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relay_core::{decode, encode, InputEvent};

// ── Event fixtures ────────────────────────────────────────────────────────────

fn fixtures() -> Vec<(&'static str, InputEvent)> {
    vec![
        ("key_down", InputEvent::KeyDown { code: 65 }),
        ("key_up", InputEvent::KeyUp { code: 0x0100_0004 }),
        ("pointer_down", InputEvent::PointerDown { x: 16384, y: 9216 }),
        ("pointer_up", InputEvent::PointerUp { x: 32767, y: 32767 }),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, event) in fixtures() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &event, |b, event| {
            b.iter(|| encode(black_box(event)).unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, event) in fixtures() {
        let line = encode(&event).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &line, |b, line| {
            b.iter(|| decode(black_box(line.as_bytes())).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
