//! Throughput of the nested-set mutations on both shipped stores.
#![forbid(unsafe_code)]
#![allow(missing_docs)]

use arbor::{
    MemoryStore, NestedSet, NodeRef, Record, RecordId, SqliteOptions, SqliteStore, TreeNode,
    TreeOptions, TreeStore,
};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

const FANOUT: usize = 8;
const NODES: usize = 512;

/// Builds a tree of `NODES` nodes, `FANOUT` children per parent, breadth first.
fn populate<S: TreeStore<Node = Record>>(tree: &mut NestedSet<S>) -> Vec<S::Node> {
    let mut root = Record::new("root");
    tree.make_root(&mut root, None).expect("root");
    let mut ids: Vec<RecordId> = vec![root.id().expect("root id")];
    let mut next_parent = 0;
    while ids.len() < NODES {
        let parent = ids[next_parent];
        for _ in 0..FANOUT {
            let mut node = Record::new(format!("n{}", ids.len()));
            tree.insert_as_last_child_of(&mut node, NodeRef::Id(parent))
                .expect("insert");
            ids.push(node.id().expect("id"));
        }
        next_parent += 1;
    }
    ids.iter()
        .map(|id| tree.get(*id).expect("load").expect("row"))
        .collect()
}

fn memory_tree() -> NestedSet<MemoryStore> {
    NestedSet::new(MemoryStore::new(), TreeOptions::default())
}

fn sqlite_tree() -> NestedSet<SqliteStore> {
    let store = SqliteStore::open_in_memory(SqliteOptions::default()).expect("sqlite");
    NestedSet::new(store, TreeOptions::default())
}

fn mutations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutations");
    group.sample_size(20);

    group.throughput(Throughput::Elements(NODES as u64));
    group.bench_function("memory/build", |b| {
        b.iter(|| {
            let mut tree = memory_tree();
            black_box(populate(&mut tree).len());
        });
    });
    group.bench_function("sqlite/build", |b| {
        b.iter(|| {
            let mut tree = sqlite_tree();
            black_box(populate(&mut tree).len());
        });
    });

    group.throughput(Throughput::Elements(1));
    group.bench_function("memory/move_subtree", |b| {
        b.iter_batched(
            || {
                let mut tree = memory_tree();
                let nodes = populate(&mut tree);
                (tree, nodes)
            },
            |(mut tree, mut nodes)| {
                let target = nodes[NODES - 1].clone();
                tree.move_as_last_child_of(&mut nodes[1], &target)
                    .expect("move");
                black_box(nodes[1].bounds());
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("sqlite/move_subtree", |b| {
        b.iter_batched(
            || {
                let mut tree = sqlite_tree();
                let nodes = populate(&mut tree);
                (tree, nodes)
            },
            |(mut tree, mut nodes)| {
                let target = nodes[NODES - 1].clone();
                tree.move_as_last_child_of(&mut nodes[1], &target)
                    .expect("move");
                black_box(nodes[1].bounds());
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("sqlite/descendants", |b| {
        let mut tree = sqlite_tree();
        let nodes = populate(&mut tree);
        b.iter(|| black_box(tree.descendants(&nodes[0], None, false).expect("query").len()));
    });

    group.finish();
}

criterion_group!(benches, mutations);
criterion_main!(benches);
