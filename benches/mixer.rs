//! A benchmark for the LSTM mixer.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lstm_mixer::LstmMixer;

fn get_inputs(width: usize, step: usize) -> Vec<f32> {
    (0..width)
        .map(|i| if (step >> (i % 16)) & 1 == 1 { 1. } else { -1. })
        .collect()
}

fn predict_and_learn(inputs: usize, cells: usize, steps: usize) {
    let mut mixer = LstmMixer::new(inputs, cells, 0.02).unwrap();
    let mut sum = 0.;
    for i in 0..steps {
        let p = mixer.predict(&get_inputs(inputs, i)).unwrap();
        mixer.learn((i % 3 == 0) as u8).unwrap();
        sum += p;
    }
    black_box(sum);
}

fn predict_only(inputs: usize, cells: usize, steps: usize) {
    let mut mixer = LstmMixer::new(inputs, cells, 0.02).unwrap();
    let mut sum = 0.;
    for i in 0..steps {
        sum += mixer.predict(&get_inputs(inputs, i)).unwrap();
    }
    black_box(sum);
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("predict+learn 8x16", |b| {
        b.iter(|| predict_and_learn(8, 16, 1000))
    });
    c.bench_function("predict+learn 16x32", |b| {
        b.iter(|| predict_and_learn(16, 32, 1000))
    });
    c.bench_function("predict 16x32", |b| {
        b.iter(|| predict_only(16, 32, 1000))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
