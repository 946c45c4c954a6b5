// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use direct_vo_rs::core::track::reduction;
use direct_vo_rs::misc::type_aliases::{Float, Vec6};

const NB_PIXELS: usize = 640 * 480;

fn criterion_benchmark(c: &mut Criterion) {
    let residuals: Vec<Float> = (0..NB_PIXELS)
        .map(|i| ((i % 17) as Float - 8.0) * 0.01)
        .collect();
    let weights: Vec<Float> = (0..NB_PIXELS).map(|i| ((i % 3) as Float) * 0.5).collect();
    let jacobians: Vec<Vec6> = (0..NB_PIXELS)
        .map(|i| {
            let s = (i % 7) as Float * 0.1;
            Vec6::new(s, 0.2, -s, 0.05 * s, 0.4, s * s)
        })
        .collect();

    c.bench_function("reduce_squared_sum vga", |b| {
        b.iter(|| reduction::reduce_squared_sum(black_box(&residuals)))
    });
    c.bench_function("reduce_outer vga", |b| {
        b.iter(|| {
            reduction::reduce_outer(
                black_box(&jacobians),
                black_box(&weights),
                black_box(&residuals),
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
