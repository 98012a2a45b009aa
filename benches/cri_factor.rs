use criterion::{black_box, criterion_group, criterion_main, Criterion};

use furlong::domain::{parse_date, PastRace, Surface};
use furlong::factor;
use furlong::factor::{FactorContext, FactorKind};

fn history(starts: usize) -> Vec<PastRace> {
    (0..starts)
        .map(|index| PastRace {
            race_id: format!("r{index}"),
            horse_id: "h1".into(),
            finish_position: (index % 8 + 1) as u32,
            total_runners: 16,
            surface: Some(Surface::Turf),
            distance: Some(1400 + (index as u32 % 5) * 200),
            time: Some(format!("1:{}.{}", 33 + index % 4, index % 10)),
            last_3f: Some(33.5 + (index % 30) as f64 / 10.0),
            race_date: parse_date("2024-01-01").ok(),
            passing_order: Some(format!("{}-{}", index % 16 + 1, index % 12 + 1)),
            race_name: Some("3勝クラス".into()),
            ..Default::default()
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    fn bench(c: &mut Criterion, kind: FactorKind, starts: usize) {
        let past = history(starts);
        let mut ctx = FactorContext::new("h1", &past);
        ctx.presorted = true;
        ctx.surface = Some(Surface::Turf);
        ctx.distance = Some(1600);
        c.bench_function(&format!("cri_factor_{kind}_{starts}"), |b| {
            b.iter(|| black_box(factor::score(kind, &ctx)));
        });
    }

    for kind in [
        FactorKind::PastResults,
        FactorKind::CourseFit,
        FactorKind::TimeIndex,
        FactorKind::RunningStyle,
    ] {
        bench(c, kind, 5);
        bench(c, kind, 20);
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
