use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pivot_broker::catalog::{FieldCatalog, FieldDescriptor};
use pivot_broker::execution::{ExecutionEngine, ExecutionOptions};
use pivot_broker::filter::compile_expression;
use pivot_broker::processing::Aggregator;
use pivot_broker::types::{DataType, Field, FlatTable, Schema, Value};
use pivot_broker::{PivotEngine, PivotRequest};

const FRUITS: [&str; 8] = [
    "Apple", "Pear", "Banana", "Cherry", "Plum", "Kiwi", "Mango", "Fig",
];

fn bench_rows() -> usize {
    std::env::var("PIVOT_BENCH_ROWS")
        .ok()
        .and_then(|v| v.replace('_', "").parse::<usize>().ok())
        .filter(|&v| v >= 1_000)
        .unwrap_or(200_000)
}

fn build(rows: usize) -> (FlatTable, FieldCatalog) {
    let schema = Schema::new(vec![
        Field::new("Fruit", DataType::Utf8),
        Field::new("Year", DataType::Int64),
        Field::new("Size", DataType::Utf8),
        Field::new("Weight", DataType::Float64),
        Field::new("Price", DataType::Float64),
    ]);
    let sizes = ["small", "medium", "large"];
    let data = (0..rows)
        .map(|i| {
            vec![
                Value::text(FRUITS[i % FRUITS.len()]),
                Value::Int64(2015 + (i % 10) as i64),
                Value::text(sizes[(i / 7) % sizes.len()]),
                Value::Float64((i % 97) as f64 / 4.0),
                Value::Float64((i % 31) as f64 + 0.5),
            ]
        })
        .collect();
    let catalog = FieldCatalog::new(
        vec![
            FieldDescriptor::categorical("Fruit"),
            FieldDescriptor::ordinal("Year", Vec::new()),
            FieldDescriptor::ordinal(
                "Size",
                sizes.iter().map(|s| Value::text(*s)).collect(),
            ),
            FieldDescriptor::aggregate("Weight", Aggregator::Sum),
            FieldDescriptor::weighted_average("Price", "Weight"),
        ],
        &schema,
    )
    .expect("bench catalog");
    (FlatTable::new(schema, data), catalog)
}

fn bench_pivot(c: &mut Criterion) {
    let rows = bench_rows();
    let (table, catalog) = build(rows);
    let fields = ["Fruit", "Year", "Size", "Weight", "Price"];
    let recent = compile_expression("2018 <= Year < 2023 and Fruit != 'Fig'", &fields)
        .expect("bench expression");

    let sequential = PivotEngine::new(table.clone(), catalog.clone());
    let parallel = PivotEngine::new(table, catalog).with_execution(
        ExecutionEngine::new(ExecutionOptions::default()).expect("thread pool"),
    );

    let request = PivotRequest::new()
        .rows(["Fruit", "Size"])
        .cols(["Year", "(Data)"])
        .aggs(["Weight", "Price"])
        .filter(recent);

    let mut group = c.benchmark_group("pivot");
    group.sample_size(20);
    group.bench_with_input(BenchmarkId::new("sequential", rows), &request, |b, req| {
        b.iter(|| black_box(sequential.compute(req).expect("pivot")))
    });
    group.bench_with_input(BenchmarkId::new("parallel_filter", rows), &request, |b, req| {
        b.iter(|| black_box(parallel.compute(req).expect("pivot")))
    });
    group.bench_function(BenchmarkId::new("count_only", rows), |b| {
        b.iter(|| {
            black_box(
                sequential
                    .get_pivot(&[], &["Fruit"], &["Year"], &[])
                    .expect("pivot"),
            )
        })
    });
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let fields = ["Fruit", "Year", "Weight"];
    c.bench_function("compile_expression", |b| {
        b.iter(|| {
            compile_expression(
                black_box("(Fruit == 'Apple' or Fruit == 'Pear') and 2020 <= Year < 2024 and Weight > 1.5"),
                &fields,
            )
            .expect("compile")
        })
    });
}

criterion_group!(benches, bench_pivot, bench_compile);
criterion_main!(benches);
