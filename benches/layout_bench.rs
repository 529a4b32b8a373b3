use criterion::{black_box, criterion_group, criterion_main, Criterion};
use merge_core::footprint::FootprintTable;
use merge_core::layout::{layout_seed, LayoutGenerator, LayoutPlan, LayoutSettings};
use merge_core::level::LevelCatalog;
use merge_core::scene::ColliderScene;

fn bench_layout_generation(c: &mut Criterion) {
    let catalog = LevelCatalog::sample();
    let footprints = FootprintTable::build(&catalog);

    for level in 0..catalog.level_count() {
        let plan = match LayoutPlan::for_level(&catalog, &footprints, level, 2) {
            Ok(plan) => plan,
            Err(e) => panic!("sample level {level} has no plan: {e}"),
        };
        c.bench_function(&format!("layout_level_{level}"), |b| {
            b.iter(|| {
                let mut scene = ColliderScene::new();
                let mut generator = LayoutGenerator::new(LayoutSettings::default());
                generator.begin(plan.clone(), layout_seed(black_box(42), level));
                generator.run_to_completion(&mut scene).placements.len()
            })
        });
    }
}

fn bench_coarse_grid(c: &mut Criterion) {
    let catalog = LevelCatalog::sample();
    let footprints = FootprintTable::build(&catalog);
    let Ok(plan) = LayoutPlan::for_level(&catalog, &footprints, 2, 2) else {
        return;
    };
    let settings = LayoutSettings {
        ray_spacing: 2.0,
        ..LayoutSettings::default()
    };

    c.bench_function("layout_level_2_spacing_2", |b| {
        b.iter(|| {
            let mut scene = ColliderScene::new();
            let mut generator = LayoutGenerator::new(settings.clone());
            generator.begin(plan.clone(), layout_seed(black_box(7), 2));
            generator.run_to_completion(&mut scene).placements.len()
        })
    });
}

criterion_group!(benches, bench_layout_generation, bench_coarse_grid);
criterion_main!(benches);
