use criterion::{black_box, criterion_group, criterion_main, Criterion};
use girafscript::script::tokenize::{markers, Delimiters};
use girafscript::script::{Context, Engine, Value};

fn make_page(repeats: usize) -> String {
    let chunk = "<p>The quick brown fox jumps over the lazy dog.</p>\n";
    let mut page = chunk.repeat(repeats);
    page.push_str("{{loop rows as=row}}<li>{{var row.title}}</li>{{/loop}}\n");
    page.push_str(&chunk.repeat(repeats));
    page
}

fn make_ctx(rows: usize) -> Context {
    let rows: Vec<Value> = (0..rows)
        .map(|i| [("title", format!("Item {i}"))].into_iter().collect())
        .collect();
    Context::new().with("rows", rows)
}

fn bench_scan(c: &mut Criterion) {
    let delims = Delimiters::default();
    let plain_small = make_page(100); // ~5k
    let plain_large = make_page(10000); // ~500k

    let mut g = c.benchmark_group("scan");
    g.bench_function("markers_small", |b| {
        b.iter(|| markers(black_box(&plain_small), &delims).count())
    });
    g.bench_function("markers_large", |b| {
        b.iter(|| markers(black_box(&plain_large), &delims).count())
    });
    g.finish();
}

fn bench_expand(c: &mut Criterion) {
    let engine = Engine::new();
    let page = make_page(100);

    let mut g = c.benchmark_group("expand");
    for rows in [10, 100, 1000] {
        let ctx = make_ctx(rows);
        g.bench_function(format!("loop_{rows}"), |b| {
            b.iter(|| {
                let mut ctx = ctx.clone();
                engine.process(black_box(&page), &mut ctx)
            })
        });
    }
    g.finish();
}

criterion_group!(benches, bench_scan, bench_expand);
criterion_main!(benches);
