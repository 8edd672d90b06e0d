use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tally_store::{LedgerStore, RecordReader, RecordWriter};
use tally_types::{Category, RecordDraft, RecordPatch};

const ACTOR: &str = "bench";

fn seeded(count: usize) -> LedgerStore {
    let store = LedgerStore::new();
    for i in 0..count {
        let draft = RecordDraft::named(format!("10.0.{}.{}", i / 256, i % 256))
            .with_tags(["bench"])
            .with_attribute("rack", format!("r{}", i % 12));
        store
            .create(Category::Address, draft, ACTOR)
            .expect("seed create");
    }
    store
}

fn bench_create(c: &mut Criterion) {
    c.bench_function("create_into_1000", |b| {
        b.iter_batched(
            || seeded(1000),
            |store| {
                store
                    .create(Category::Address, RecordDraft::named("10.9.9.9"), ACTOR)
                    .expect("create")
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_update(c: &mut Criterion) {
    let store = seeded(1000);
    let target = store.list(Category::Address).expect("list")[500].id.clone();
    c.bench_function("update_in_1000", |b| {
        b.iter(|| {
            let patch = RecordPatch {
                description: Some("patched".into()),
                ..Default::default()
            };
            store
                .update(Category::Address, black_box(&target), patch, ACTOR)
                .expect("update")
        })
    });
}

fn bench_delete_and_undo(c: &mut Criterion) {
    let store = seeded(1000);
    let first = store.list(Category::Address).expect("list")[0].id.clone();
    c.bench_function("delete_then_undo_1000", |b| {
        b.iter(|| {
            store
                .delete(Category::Address, black_box(&first), ACTOR)
                .expect("delete");
            store.undo().expect("undo");
        })
    });
}

fn bench_verify_audit(c: &mut Criterion) {
    let store = seeded(1000);
    c.bench_function("verify_audit_1000", |b| {
        b.iter(|| black_box(store.verify_audit().expect("verify")))
    });
}

criterion_group!(
    benches,
    bench_create,
    bench_update,
    bench_delete_and_undo,
    bench_verify_audit
);
criterion_main!(benches);
