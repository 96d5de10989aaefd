//! Benchmarks for indexing, chunk loading, line parsing and field escaping.

use std::io::{BufWriter, Write};

use bigcsv::dsv::{build_index, escape_field, load_chunk, parse_line};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::NamedTempFile;

/// Write `rows` rows of mixed plain and quoted fields.
fn generate_file(rows: usize, seed: u64) -> NamedTempFile {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let file = NamedTempFile::new().unwrap();
    let mut out = BufWriter::new(file.reopen().unwrap());
    writeln!(out, "id,name,city,score,notes").unwrap();
    for i in 0..rows {
        let score: u32 = rng.gen_range(0..100_000);
        let notes = if rng.gen_bool(0.2) {
            "\"quoted, with comma\""
        } else {
            "plain"
        };
        writeln!(out, "{},User{},Springfield,{},{}", i, i, score, notes).unwrap();
    }
    out.flush().unwrap();
    drop(out);
    file
}

fn bench_build_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_index");
    group.sample_size(20);

    for rows in [10_000, 100_000, 1_000_000] {
        let file = generate_file(rows, 42);
        let len = std::fs::metadata(file.path()).unwrap().len();
        group.throughput(Throughput::Bytes(len));

        group.bench_with_input(BenchmarkId::from_parameter(rows), &file, |b, file| {
            b.iter(|| build_index(black_box(file.path()), 1000).unwrap())
        });
    }

    group.finish();
}

fn bench_load_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_chunk");
    let file = generate_file(1_000_000, 7);

    for chunk_size in [100, 1000, 10_000] {
        let index = build_index(file.path(), chunk_size).unwrap();
        let last = index.offsets()[index.chunk_count() - 1];
        group.throughput(Throughput::Elements(chunk_size as u64));

        group.bench_with_input(
            BenchmarkId::new("last_chunk", chunk_size),
            &chunk_size,
            |b, &k| b.iter(|| load_chunk(file.path(), black_box(last), k).unwrap()),
        );
    }

    group.finish();
}

fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_line");

    let plain = "12345,User12345,Springfield,98765,plain";
    let quoted = "12345,\"Doe, Jane\",\"Springfield, IL\",98765,\"quoted, with comma\"";
    for (name, line) in [("plain", plain), ("quoted", quoted)] {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_function(name, |b| b.iter(|| parse_line(black_box(line))));
    }

    group.finish();
}

fn bench_escape_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("escape_field");

    for (name, field) in [
        ("plain", "Springfield"),
        ("delimiter", "Doe, Jane"),
        ("quotes", "say \"hi\" twice \"now\""),
    ] {
        group.bench_function(name, |b| b.iter(|| escape_field(black_box(field))));
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build_index,
    bench_load_chunk,
    bench_parse_line,
    bench_escape_field
);
criterion_main!(benches);
