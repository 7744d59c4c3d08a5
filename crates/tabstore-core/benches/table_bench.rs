use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::distributions::Alphanumeric;
use rand::prelude::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use tabstore_core::{Column, ColumnType, Condition, Config, Database, Predicate, Row, Schema, Table};

const ROWS: usize = 1_000;

fn schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::Int).primary_key(),
        Column::new("name", ColumnType::String).not_null(),
        Column::new("city", ColumnType::String),
        Column::new("age", ColumnType::Int),
    ])
    .unwrap()
}

fn random_row(rng: &mut StdRng) -> Row {
    let name: String = (0..12).map(|_| rng.sample(Alphanumeric) as char).collect();
    let cities = ["Paris", "Lyon", "Nice", "Lille", "Nantes"];
    let mut row = Row::new();
    row.insert("name".into(), name);
    row.insert("city".into(), cities[rng.gen_range(0..cities.len())].into());
    row.insert("age".into(), rng.gen_range(18..90).to_string());
    row
}

fn filled_table(dir: &TempDir, rows: usize) -> std::sync::Arc<Table> {
    let db = Database::create(&Config::ephemeral(dir.path()), "bench").unwrap();
    let table = db.create_table("people", schema()).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..rows {
        table.insert(random_row(&mut rng)).unwrap();
    }
    table
}

/// Insert cost is dominated by the whole-file snapshot rewrite.
fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert_into_100_rows", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let table = filled_table(&dir, 100);
                (dir, table, StdRng::seed_from_u64(7))
            },
            |(_dir, table, mut rng)| {
                table.insert(black_box(random_row(&mut rng))).unwrap();
            },
            BatchSize::PerIteration,
        )
    });
}

fn bench_point_select(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let table = filled_table(&dir, ROWS);
    let mut rng = StdRng::seed_from_u64(1);

    c.bench_function("point_select", |b| {
        b.iter(|| {
            let key = rng.gen_range(1..=ROWS).to_string();
            let found = table.select_where(&Predicate::single(Condition::eq("id", key))).unwrap();
            black_box(found);
        })
    });
}

fn bench_like_scan(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let table = filled_table(&dir, ROWS);
    let predicate = Predicate::single(Condition::like("name", "%a%b%"));

    c.bench_function("like_scan", |b| {
        b.iter(|| black_box(table.select_where(&predicate).unwrap()))
    });
}

criterion_group!(benches, bench_insert, bench_point_select, bench_like_scan);
criterion_main!(benches);
