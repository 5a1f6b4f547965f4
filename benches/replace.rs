use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use richdoc::{Assoc, Mappable, Node, Slice, Transform};
use richdoc_testkit::schema;

/// Create a document of `size` paragraphs, every third one inside a blockquote.
fn create_doc(size: usize) -> Node {
    let schema = schema();
    let blocks: Vec<Node> = (0..size)
        .map(|i| {
            let text = schema.text(&format!("paragraph number {i}"), vec![]).unwrap();
            let para = schema.node("paragraph", None, text, vec![]).unwrap();
            if i % 3 == 0 {
                schema.node("blockquote", None, para, vec![]).unwrap()
            } else {
                para
            }
        })
        .collect();
    schema.node("doc", None, blocks, vec![]).unwrap()
}

fn bench_replace_across_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("replace_across_blocks");

    for size in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let doc = create_doc(size);
            let mid = doc.content_size() / 2;
            let slice = doc.slice(5, 40, false).unwrap();
            b.iter(|| {
                let mut tr = Transform::new(doc.clone());
                tr.replace(mid, mid + 30, slice.clone()).unwrap();
                black_box(tr.doc());
            });
        });
    }

    group.finish();
}

fn bench_delete_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_range");

    for size in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let doc = create_doc(size);
            let end = doc.content_size() - 3;
            b.iter(|| {
                let mut tr = Transform::new(doc.clone());
                tr.delete_range(3, end).unwrap();
                black_box(tr.doc());
            });
        });
    }

    group.finish();
}

fn bench_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping");

    for steps in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            let doc = create_doc(10);
            let text = schema().text("x", vec![]).unwrap();
            let mut tr = Transform::new(doc);
            for _ in 0..steps {
                tr.replace(2, 2, Slice::new(text.clone().into(), 0, 0)).unwrap();
            }
            let end = tr.before().content_size();
            b.iter(|| {
                for pos in 0..end {
                    black_box(tr.mapping().map(pos, Assoc::After));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_replace_across_blocks,
    bench_delete_range,
    bench_mapping
);
criterion_main!(benches);
