//! Benchmarks for tree assembly and planning.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mirror_output::MockOutput;
use mirror_sync::{
    ChangeCache, ContainerRecords, DocRef, NodeKind, Record, RenameIndex, TreeBuilder, TreeOptions,
    plan,
};

const NAMESPACE: &str = "team/handbook";

fn record(kind: NodeKind, identity: String, parent: Option<String>, title: String) -> Record {
    Record {
        slug: identity.clone(),
        identity,
        parent,
        kind,
        title,
        namespace: NAMESPACE.to_owned(),
        doc: None,
    }
}

/// Generate `groups` containers with `docs_per_group` documents each. Every
/// tenth title repeats so sibling dedup is exercised.
fn generate_records(groups: usize, docs_per_group: usize) -> ContainerRecords {
    let mut entries = Vec::with_capacity(groups * (docs_per_group + 1));
    let mut id = 0u64;
    for g in 0..groups {
        let group = format!("g{g}");
        entries.push(record(
            NodeKind::Container,
            group.clone(),
            None,
            format!("Group {g}"),
        ));
        for d in 0..docs_per_group {
            id += 1;
            let title = if d % 10 == 0 {
                "Overview".to_owned()
            } else {
                format!("Page {d}: notes/draft")
            };
            entries.push(Record {
                doc: Some(DocRef {
                    id,
                    tag: "2024-01-01T00:00:00.000Z".to_owned(),
                }),
                ..record(NodeKind::Doc, format!("d{id}"), Some(group.clone()), title)
            });
        }
    }

    ContainerRecords {
        root: record(
            NodeKind::Root,
            NAMESPACE.to_owned(),
            None,
            "Handbook".to_owned(),
        ),
        entries,
        unlisted: Vec::new(),
    }
}

fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");

    for (groups, docs) in [(10, 10), (50, 40), (100, 100)] {
        let records = generate_records(groups, docs);
        group.throughput(Throughput::Elements(records.entries.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("records", format!("{groups}x{docs}")),
            &records,
            |b, records| {
                b.iter(|| {
                    TreeBuilder::new(TreeOptions::default())
                        .build(vec![black_box(records.clone())])
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_plan_unchanged(c: &mut Criterion) {
    let tree = TreeBuilder::new(TreeOptions::default())
        .build(vec![generate_records(50, 40)])
        .unwrap();
    let index = RenameIndex::from_tree(&tree);
    let cache = ChangeCache::default();
    let output = MockOutput::new();

    c.bench_function("plan_2000_documents", |b| {
        b.iter(|| plan(black_box(&tree), &cache, &index, &output));
    });
}

criterion_group!(benches, bench_tree_build, bench_plan_unchanged);
criterion_main!(benches);
