use criterion::{black_box, criterion_group, criterion_main, Criterion};
use finsim_gen::{apply_trends, generate, run, Profile};

fn bench_generate(c: &mut Criterion) {
    let profile = Profile::default();
    c.bench_function("generate 2002-2025", |b| {
        b.iter(|| black_box(generate(&profile)))
    });

    let mut wide = Profile::default();
    wide.start_year = 1970;
    wide.end_year = 2100;
    c.bench_function("run 1970-2100", |b| b.iter(|| black_box(run(&wide))));

    let raw = generate(&profile).expect("default profile generates");
    c.bench_function("apply_trends", |b| {
        b.iter(|| {
            let mut ds = raw.clone();
            black_box(apply_trends(&mut ds, &profile.events))
        })
    });
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
