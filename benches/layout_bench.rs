use std::hint::black_box;
use std::rc::Rc;

use chart_studio::api::{ChartConfig, DiscreteBarChart};
use chart_studio::core::{
    Bounds, CachedTextMeasurer, DiscreteBarDatum, HeuristicTextMeasurer, TextMeasurer,
};
use chart_studio::reactive::Graph;
use criterion::{Criterion, criterion_group, criterion_main};

fn dataset(rows: usize) -> Vec<DiscreteBarDatum> {
    (0..rows)
        .map(|i| {
            let value = ((i as f64) * 37.0 % 200.0) - 60.0;
            DiscreteBarDatum::new(format!("row-{i}"), format!("Entity {i}"), value)
        })
        .collect()
}

fn measurer() -> Rc<dyn TextMeasurer> {
    Rc::new(CachedTextMeasurer::new(HeuristicTextMeasurer))
}

fn bench_full_layout_200_rows(c: &mut Criterion) {
    let rows = dataset(200);

    c.bench_function("discrete_bar_full_layout_200", |b| {
        b.iter(|| {
            let chart = DiscreteBarChart::new(
                &Graph::new(),
                ChartConfig::default(),
                black_box(rows.clone()),
                Bounds::new(0.0, 0.0, 800.0, 600.0),
                measurer(),
            )
            .expect("chart init");
            let _ = chart.layout().expect("layout");
        })
    });
}

fn bench_resize_200_rows(c: &mut Criterion) {
    let graph = Graph::new();
    let chart = DiscreteBarChart::new(
        &graph,
        ChartConfig::default(),
        dataset(200),
        Bounds::new(0.0, 0.0, 800.0, 600.0),
        measurer(),
    )
    .expect("chart init");
    chart.layout().expect("layout");

    let mut toggle = false;
    c.bench_function("discrete_bar_resize_200", |b| {
        b.iter(|| {
            toggle = !toggle;
            let bounds = if toggle {
                Bounds::new(0.0, 0.0, 360.0, 500.0)
            } else {
                Bounds::new(0.0, 0.0, 800.0, 600.0)
            };
            chart.set_bounds(black_box(bounds)).expect("bounds");
            let _ = chart.layout().expect("layout");
        })
    });
}

criterion_group!(benches, bench_full_layout_200_rows, bench_resize_200_rows);
criterion_main!(benches);
