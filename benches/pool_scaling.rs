use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pzip::{create_tar_gz, create_zip, extract_archive, ArchiveOptions};
use rand::{Rng, SeedableRng};
use std::fs;
use std::hint::black_box;
use std::path::Path;
use tempfile::TempDir;

const FILES: usize = 200;
const FILE_SIZE: usize = 32 * 1024;

/// Half random, half repetitive files so both store-like and deflate-friendly
/// payloads are exercised.
fn make_tree() -> (TempDir, u64) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    for i in 0..FILES {
        let sub = dir.path().join(format!("d{}", i % 8));
        fs::create_dir_all(&sub).expect("mkdir");
        let data: Vec<u8> = if i % 2 == 0 {
            (0..FILE_SIZE).map(|_| rng.gen()).collect()
        } else {
            b"pzip bench line\n".iter().copied().cycle().take(FILE_SIZE).collect()
        };
        fs::write(sub.join(format!("f{i}.dat")), data).expect("write");
    }
    (dir, (FILES * FILE_SIZE) as u64)
}

fn bench_create(c: &mut Criterion) {
    let (tree, bytes) = make_tree();
    let out = tempfile::tempdir().expect("tempdir");
    let mut group = c.benchmark_group("create");
    group.throughput(Throughput::Bytes(bytes));
    group.sample_size(10);

    for workers in [1, 2, 4, 8] {
        let options = ArchiveOptions::default().with_workers(workers);
        group.bench_with_input(BenchmarkId::new("zip", workers), &options, |b, options| {
            let archive = out.path().join(format!("bench-{workers}.zip"));
            b.iter(|| black_box(create_zip(tree.path(), &archive, options, None).expect("create zip")));
        });
        group.bench_with_input(BenchmarkId::new("tar.gz", workers), &options, |b, options| {
            let archive = out.path().join(format!("bench-{workers}.tar.gz"));
            b.iter(|| black_box(create_tar_gz(tree.path(), &archive, options, None).expect("create tar.gz")));
        });
    }
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let (tree, bytes) = make_tree();
    let out = tempfile::tempdir().expect("tempdir");
    let archive = out.path().join("bench.zip");
    create_zip(tree.path(), &archive, &ArchiveOptions::default(), None).expect("create zip");

    let mut group = c.benchmark_group("extract");
    group.throughput(Throughput::Bytes(bytes));
    group.sample_size(10);
    for workers in [1, 2, 4, 8] {
        let options = ArchiveOptions::default().with_workers(workers);
        let dest = out.path().join(format!("x{workers}"));
        group.bench_with_input(BenchmarkId::new("zip", workers), &options, |b, options| {
            b.iter(|| black_box(extract_archive(&archive, Path::new(&dest), options, None).expect("extract")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_create, bench_extract);
criterion_main!(benches);
