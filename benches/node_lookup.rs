use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dagfs::{Caller, FileSystem};

fn deep_tree(depth: usize) -> (FileSystem, String) {
    let mut fs = FileSystem::empty();
    let path: String = (0..depth).map(|i| format!("/d{}", i)).collect();
    fs.mkdir(&path, true, &Caller::root()).unwrap();
    let file = format!("{}/leaf", path);
    fs.write(&file, b"payload", &Caller::root()).unwrap();
    (fs, file)
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for depth in [4usize, 16, 64] {
        let (fs, file) = deep_tree(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &file, |b, file| {
            b.iter(|| fs.resolve(black_box(file), true).unwrap())
        });
    }
    group.finish();
}

fn bench_write_deep(c: &mut Criterion) {
    let (mut fs, file) = deep_tree(32);
    let mut n = 0u64;
    c.bench_function("write_depth_32", |b| {
        b.iter(|| {
            n += 1;
            fs.write(&file, &n.to_le_bytes(), &Caller::root()).unwrap();
        })
    });
}

criterion_group!(benches, bench_resolve, bench_write_deep);
criterion_main!(benches);
