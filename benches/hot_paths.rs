use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tui_heatmap::data::{sample_points, simple_world};
use tui_heatmap::heat::density::{max_intensity, DensityBuffer};
use tui_heatmap::heat::palette::{colorize, Palette};
use tui_heatmap::heat::projection::{Projection, Projector};
use tui_heatmap::heat::sprite::KernelSprite;
use tui_heatmap::heat::{HeatConfig, HeatmapEngine};

const WIDTH: usize = 600;
const HEIGHT: usize = 300;

fn bench_accumulate(c: &mut Criterion) {
    let points = sample_points();
    let projector = Projector::new(Projection::Mercator, WIDTH as f64, HEIGHT as f64);
    let sprite = KernelSprite::build(28.0, 15.0, 1.0);
    let max = max_intensity(&points, None);

    c.bench_function("accumulate_600x300", |b| {
        b.iter(|| {
            let mut buffer = DensityBuffer::try_new(WIDTH, HEIGHT).unwrap();
            buffer.accumulate(black_box(&points), &projector, &sprite, max, 0.0, None);
            buffer
        })
    });
}

fn bench_colorize(c: &mut Criterion) {
    let points = sample_points();
    let projector = Projector::new(Projection::Mercator, WIDTH as f64, HEIGHT as f64);
    let sprite = KernelSprite::build(28.0, 15.0, 1.0);
    let mut buffer = DensityBuffer::try_new(WIDTH, HEIGHT).unwrap();
    buffer.accumulate(&points, &projector, &sprite, max_intensity(&points, None), 0.0, None);
    let palette = Palette::default();

    c.bench_function("colorize_600x300", |b| {
        b.iter(|| colorize(black_box(&buffer), &palette, 30).unwrap())
    });
}

fn bench_render_and_query(c: &mut Criterion) {
    let points = sample_points();
    let world = simple_world();
    let mut engine = HeatmapEngine::new(HeatConfig::default(), WIDTH, HEIGHT, 1.0);

    c.bench_function("render_clipped_600x300", |b| {
        b.iter(|| engine.render(black_box(&points), Some(&world)))
    });

    engine.render(&points, Some(&world));
    c.bench_function("query", |b| {
        b.iter(|| engine.query(black_box(176.5), black_box(110.0)))
    });
}

criterion_group!(benches, bench_accumulate, bench_colorize, bench_render_and_query);
criterion_main!(benches);
