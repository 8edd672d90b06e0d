//! Ordered, per-category record lists.
//!
//! [`Collections`] holds every category's records behind its own `Arc`.
//! Cloning a `Collections` is cheap and is how snapshots are taken; a
//! mutation copies only the category it touches (`Arc::make_mut`), so the
//! live collection never aliases a stored snapshot.
//!
//! Within a category the records are kept sorted so that `order == index`
//! at all times.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_types::{
    normalize_description, normalize_links, normalize_tags, Category, ImportedRecord, Record,
    RecordDraft, RecordId, RecordPatch,
};

use crate::error::{StoreError, StoreResult};

/// Records of every category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collections {
    categories: [Arc<Vec<Record>>; 3],
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of `category`, sorted by `order`.
    pub fn records(&self, category: Category) -> &[Record] {
        &self.categories[category.index()]
    }

    /// Total number of records across all categories.
    pub fn total_len(&self) -> usize {
        self.categories.iter().map(|records| records.len()).sum()
    }

    pub fn get(&self, category: Category, id: &RecordId) -> StoreResult<&Record> {
        self.records(category)
            .iter()
            .find(|record| record.id == *id)
            .ok_or_else(|| StoreError::not_found(category, id))
    }

    pub fn create(&mut self, category: Category, draft: RecordDraft, now: DateTime<Utc>) -> Record {
        let records = self.records_mut(category);
        let record = Record {
            id: RecordId::generate(),
            name: draft.name,
            description: normalize_description(draft.description),
            attributes: draft.attributes,
            tags: normalize_tags(&draft.tags),
            links: normalize_links(category, draft.links),
            order: records.len(),
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        record
    }

    pub fn update(
        &mut self,
        category: Category,
        id: &RecordId,
        patch: RecordPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Record> {
        let index = self.position(category, id)?;
        let record = &mut self.records_mut(category)[index];

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(description) = patch.description {
            record.description = normalize_description(Some(description));
        }
        if let Some(attributes) = patch.attributes {
            record.attributes = attributes;
        }
        if let Some(tags) = patch.tags {
            record.tags = normalize_tags(&tags);
        }
        if let Some(links) = patch.links {
            record.links = normalize_links(category, links);
        }
        touch(record, now);
        Ok(record.clone())
    }

    /// Remove a record and renumber the rest of its category.
    ///
    /// Every remaining record gets a fresh `updated_at`.
    pub fn delete(
        &mut self,
        category: Category,
        id: &RecordId,
        now: DateTime<Utc>,
    ) -> StoreResult<Record> {
        let index = self.position(category, id)?;
        let records = self.records_mut(category);
        let removed = records.remove(index);
        for (order, record) in records.iter_mut().enumerate() {
            record.order = order;
            touch(record, now);
        }
        Ok(removed)
    }

    /// Put the listed ids first, in the given order, then every unlisted
    /// record in its previous relative order. Unknown and repeated ids are
    /// ignored. Every record gets a fresh `order` and `updated_at`.
    pub fn reorder(
        &mut self,
        category: Category,
        ordered_ids: &[RecordId],
        now: DateTime<Utc>,
    ) -> Vec<Record> {
        let records = self.records_mut(category);
        let index: HashMap<RecordId, usize> = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();

        let mut slots: Vec<Option<Record>> = std::mem::take(records).into_iter().map(Some).collect();
        let mut reordered = Vec::with_capacity(slots.len());
        for id in ordered_ids {
            if let Some(record) = index.get(id).and_then(|&i| slots[i].take()) {
                reordered.push(record);
            }
        }
        reordered.extend(slots.into_iter().flatten());

        for (order, record) in reordered.iter_mut().enumerate() {
            record.order = order;
            touch(record, now);
        }
        *records = reordered;
        records.clone()
    }

    /// Reorder requiring `ordered_ids` to be an exact permutation of the category.
    pub fn reorder_exact(
        &mut self,
        category: Category,
        ordered_ids: &[RecordId],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Record>> {
        let expected = self.records(category).len();
        if ordered_ids.len() != expected {
            return Err(StoreError::OrderLengthMismatch {
                expected,
                actual: ordered_ids.len(),
            });
        }
        let mut seen: HashSet<&RecordId> = HashSet::with_capacity(expected);
        for id in ordered_ids {
            if !seen.insert(id) {
                return Err(StoreError::DuplicateId {
                    category,
                    id: id.clone(),
                });
            }
            self.position(category, id)?;
        }
        Ok(self.reorder(category, ordered_ids, now))
    }

    /// Substitute the entire content of a category.
    ///
    /// Validation happens before anything changes: a duplicate id leaves the
    /// category untouched.
    pub fn replace(
        &mut self,
        category: Category,
        imported: Vec<ImportedRecord>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Record>> {
        let mut seen = HashSet::new();
        let mut replacement = Vec::with_capacity(imported.len());
        for (order, item) in imported.into_iter().enumerate() {
            let id = match item.id {
                Some(id) if !id.is_blank() => id,
                _ => RecordId::generate(),
            };
            if !seen.insert(id.clone()) {
                return Err(StoreError::DuplicateId { category, id });
            }
            let created_at = item.created_at.unwrap_or(now);
            replacement.push(Record {
                id,
                name: item.name,
                description: normalize_description(item.description),
                attributes: item.attributes,
                tags: normalize_tags(&item.tags),
                links: normalize_links(category, item.links),
                order,
                created_at,
                updated_at: now.max(created_at),
            });
        }

        *self.records_mut(category) = replacement.clone();
        Ok(replacement)
    }

    /// Linked records that still exist, grouped by category in stable order.
    pub fn resolve_links(
        &self,
        category: Category,
        id: &RecordId,
    ) -> StoreResult<BTreeMap<Category, Vec<Record>>> {
        let record = self.get(category, id)?;
        let mut resolved = BTreeMap::new();
        for (linked_category, ids) in &record.links {
            let targets: Vec<Record> = ids
                .iter()
                .filter_map(|linked| self.get(*linked_category, linked).ok())
                .cloned()
                .collect();
            if !targets.is_empty() {
                resolved.insert(*linked_category, targets);
            }
        }
        Ok(resolved)
    }

    /// Cross-reference grid between two categories.
    pub fn link_matrix(&self, from: Category, to: Category) -> LinkMatrix {
        let rows = self.records(from);
        let columns = self.records(to);
        let cells = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.links_to(to, &column.id) || column.links_to(from, &row.id))
                    .collect()
            })
            .collect();

        LinkMatrix {
            from,
            to,
            rows: rows.iter().map(MatrixLabel::from).collect(),
            columns: columns.iter().map(MatrixLabel::from).collect(),
            cells,
        }
    }

    /// Panics if any category breaks the `order == index` invariant.
    #[cfg(test)]
    pub(crate) fn assert_ordered(&self) {
        for category in Category::ALL {
            for (index, record) in self.records(category).iter().enumerate() {
                assert_eq!(record.order, index, "{category} order gap at {index}");
            }
        }
    }

    fn position(&self, category: Category, id: &RecordId) -> StoreResult<usize> {
        self.records(category)
            .iter()
            .position(|record| record.id == *id)
            .ok_or_else(|| StoreError::not_found(category, id))
    }

    fn records_mut(&mut self, category: Category) -> &mut Vec<Record> {
        Arc::make_mut(&mut self.categories[category.index()])
    }
}

fn touch(record: &mut Record, now: DateTime<Utc>) {
    record.updated_at = now.max(record.updated_at);
}

/// Row or column header of a [`LinkMatrix`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixLabel {
    pub id: RecordId,
    pub name: String,
}

impl From<&Record> for MatrixLabel {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
        }
    }
}

/// Which `from` records are linked with which `to` records.
///
/// A cell is set when either record links to the other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMatrix {
    pub from: Category,
    pub to: Category,
    pub rows: Vec<MatrixLabel>,
    pub columns: Vec<MatrixLabel>,
    pub cells: Vec<Vec<bool>>,
}

impl LinkMatrix {
    /// Number of set cells.
    pub fn link_count(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| **cell).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn seeded(names: &[&str]) -> (Collections, Vec<RecordId>) {
        let mut c = Collections::new();
        let ids = names
            .iter()
            .enumerate()
            .map(|(i, name)| c.create(Category::Address, RecordDraft::named(*name), t(i as i64)).id)
            .collect();
        (c, ids)
    }

    fn names(c: &Collections, category: Category) -> Vec<String> {
        c.records(category).iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn create_assigns_order_and_timestamps() {
        let mut c = Collections::new();
        let first = c.create(Category::Address, RecordDraft::named("10.0.0.1"), t(0));
        let second = c.create(Category::Address, RecordDraft::named("10.0.0.2"), t(1));

        assert_eq!(first.order, 0);
        assert_eq!(second.order, 1);
        assert_ne!(first.id, second.id);
        assert_eq!(first.created_at, first.updated_at);
        assert!(c.records(Category::Person).is_empty());
    }

    #[test]
    fn create_normalizes_tags() {
        let mut c = Collections::new();
        let record = c.create(
            Category::System,
            RecordDraft::named("db").with_tags(["b", "A", "a", " b "]),
            t(0),
        );
        assert_eq!(record.tags, vec!["a", "b"]);
    }

    #[test]
    fn update_overwrites_only_present_fields() {
        let mut c = Collections::new();
        let original = c.create(
            Category::System,
            RecordDraft::named("db")
                .with_tags(["prod"])
                .with_attribute("os", "linux"),
            t(0),
        );

        let updated = c
            .update(
                Category::System,
                &original.id,
                RecordPatch {
                    name: Some("db-01".into()),
                    ..Default::default()
                },
                t(5),
            )
            .unwrap();
        assert_eq!(updated.name, "db-01");
        assert_eq!(updated.tags, vec!["prod"]);
        assert_eq!(updated.attributes["os"], "linux");
        assert_eq!(updated.updated_at, t(5));
        assert_eq!(updated.created_at, t(0));
    }

    #[test]
    fn update_with_empty_collections_clears() {
        let mut c = Collections::new();
        let original = c.create(
            Category::System,
            RecordDraft::named("db")
                .with_tags(["prod"])
                .with_attribute("os", "linux"),
            t(0),
        );

        let updated = c
            .update(
                Category::System,
                &original.id,
                RecordPatch {
                    tags: Some(vec![]),
                    attributes: Some(BTreeMap::new()),
                    description: Some(String::new()),
                    ..Default::default()
                },
                t(1),
            )
            .unwrap();
        assert!(updated.tags.is_empty());
        assert!(updated.attributes.is_empty());
        assert!(updated.description.is_none());
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut c = Collections::new();
        let err = c
            .update(Category::Person, &"nope".into(), RecordPatch::default(), t(0))
            .unwrap_err();
        assert_eq!(err, StoreError::not_found(Category::Person, &"nope".into()));
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let mut c = Collections::new();
        let record = c.create(Category::Person, RecordDraft::named("ana"), t(10));
        let updated = c
            .update(Category::Person, &record.id, RecordPatch::default(), t(3))
            .unwrap();
        assert_eq!(updated.updated_at, t(10));
    }

    #[test]
    fn delete_closes_order_gap() {
        let (mut c, ids) = seeded(&["a", "b", "c", "d"]);
        c.delete(Category::Address, &ids[1], t(10)).unwrap();

        c.assert_ordered();
        assert_eq!(names(&c, Category::Address), vec!["a", "c", "d"]);
        let records = c.records(Category::Address);
        assert!(records.iter().all(|r| r.updated_at == t(10)));
        assert_eq!(records[0].created_at, t(0));
        assert_eq!(records[1].created_at, t(2));
    }

    #[test]
    fn delete_unknown_id_is_not_found() {
        let (mut c, _) = seeded(&["a"]);
        assert!(matches!(
            c.delete(Category::Address, &"ghost".into(), t(1)),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(c.records(Category::Address).len(), 1);
    }

    #[test]
    fn reorder_places_listed_first_then_leftovers() {
        let (mut c, ids) = seeded(&["a", "b", "c", "d", "e"]);
        let result = c.reorder(
            Category::Address,
            &[ids[3].clone(), "ghost".into(), ids[1].clone(), ids[3].clone()],
            t(20),
        );

        let order: Vec<_> = result.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["d", "b", "a", "c", "e"]);
        c.assert_ordered();
        assert!(result.iter().all(|r| r.updated_at == t(20)));
    }

    #[test]
    fn reorder_empty_category_returns_nothing() {
        let mut c = Collections::new();
        assert!(c.reorder(Category::Person, &["x".into()], t(0)).is_empty());
    }

    #[test]
    fn reorder_exact_requires_permutation() {
        let (mut c, ids) = seeded(&["a", "b", "c"]);

        let short = c.reorder_exact(Category::Address, &ids[..2], t(1)).unwrap_err();
        assert_eq!(short, StoreError::OrderLengthMismatch { expected: 3, actual: 2 });

        let long = vec![ids[0].clone(), ids[1].clone(), ids[2].clone(), ids[2].clone()];
        let err = c.reorder_exact(Category::Address, &long, t(1)).unwrap_err();
        assert_eq!(err, StoreError::OrderLengthMismatch { expected: 3, actual: 4 });

        let repeated = vec![ids[0].clone(), ids[0].clone(), ids[1].clone()];
        assert_eq!(
            c.reorder_exact(Category::Address, &repeated, t(1)).unwrap_err(),
            StoreError::DuplicateId { category: Category::Address, id: ids[0].clone() }
        );

        let unknown = vec![ids[0].clone(), ids[1].clone(), "ghost".into()];
        assert!(matches!(
            c.reorder_exact(Category::Address, &unknown, t(1)),
            Err(StoreError::NotFound { .. })
        ));

        let reversed: Vec<_> = ids.iter().rev().cloned().collect();
        let result = c.reorder_exact(Category::Address, &reversed, t(1)).unwrap();
        assert_eq!(result[0].name, "c");
        assert_eq!(names(&c, Category::Address), vec!["c", "b", "a"]);
    }

    #[test]
    fn replace_substitutes_whole_category() {
        let (mut c, _) = seeded(&["old-1", "old-2"]);
        let kept_created = t(-100);
        let imported = vec![
            ImportedRecord {
                id: Some("keep".into()),
                name: "new-1".into(),
                tags: vec!["X".into(), "x".into()],
                created_at: Some(kept_created),
                ..Default::default()
            },
            ImportedRecord {
                id: Some(RecordId::new("  ")),
                name: "new-2".into(),
                ..Default::default()
            },
        ];

        let result = c.replace(Category::Address, imported, t(50)).unwrap();
        assert_eq!(names(&c, Category::Address), vec!["new-1", "new-2"]);
        assert_eq!(result[0].id, RecordId::from("keep"));
        assert_eq!(result[0].created_at, kept_created);
        assert_eq!(result[0].updated_at, t(50));
        assert_eq!(result[0].tags, vec!["x"]);
        assert!(!result[1].id.is_blank());
        assert_eq!(result[1].created_at, t(50));
        c.assert_ordered();
    }

    #[test]
    fn replace_with_duplicate_ids_changes_nothing() {
        let (mut c, _) = seeded(&["a", "b"]);
        let before = c.clone();
        let imported = vec![
            ImportedRecord {
                id: Some("dup".into()),
                name: "x".into(),
                ..Default::default()
            },
            ImportedRecord {
                id: Some("dup".into()),
                name: "y".into(),
                ..Default::default()
            },
        ];
        let err = c.replace(Category::Address, imported, t(9)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(c, before);
    }

    #[test]
    fn clones_do_not_alias() {
        let (mut c, ids) = seeded(&["a", "b"]);
        let snapshot = c.clone();
        c.delete(Category::Address, &ids[0], t(5)).unwrap();

        assert_eq!(snapshot.records(Category::Address).len(), 2);
        assert_eq!(snapshot.records(Category::Address)[1].order, 1);
        assert_eq!(c.records(Category::Address).len(), 1);
    }

    #[test]
    fn resolve_links_skips_dangling_ids() {
        let mut c = Collections::new();
        let person = c.create(Category::Person, RecordDraft::named("ana"), t(0));
        let gone = c.create(Category::Person, RecordDraft::named("bo"), t(1));
        let system = c.create(
            Category::System,
            RecordDraft::named("db")
                .with_link(Category::Person, person.id.clone())
                .with_link(Category::Person, gone.id.clone())
                .with_link(Category::Address, "never-existed".into()),
            t(2),
        );
        c.delete(Category::Person, &gone.id, t(3)).unwrap();

        let resolved = c.resolve_links(Category::System, &system.id).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[&Category::Person].len(), 1);
        assert_eq!(resolved[&Category::Person][0].name, "ana");
    }

    #[test]
    fn link_matrix_marks_links_in_either_direction() {
        let mut c = Collections::new();
        let ana = c.create(Category::Person, RecordDraft::named("ana"), t(0));
        let bo = c.create(Category::Person, RecordDraft::named("bo"), t(0));
        let db = c.create(
            Category::System,
            RecordDraft::named("db").with_link(Category::Person, ana.id.clone()),
            t(0),
        );
        c.create(
            Category::System,
            RecordDraft::named("web"),
            t(0),
        );
        c.update(
            Category::Person,
            &bo.id,
            RecordPatch {
                links: Some(BTreeMap::from([(Category::System, vec![db.id.clone()])])),
                ..Default::default()
            },
            t(1),
        )
        .unwrap();

        let matrix = c.link_matrix(Category::System, Category::Person);
        assert_eq!(matrix.rows.len(), 2);
        assert_eq!(matrix.columns.len(), 2);
        assert_eq!(matrix.cells, vec![vec![true, true], vec![false, false]]);
        assert_eq!(matrix.link_count(), 2);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Create,
        Delete(usize),
        Reorder(Vec<usize>),
        Update(usize),
        Replace(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Create),
            2 => any::<usize>().prop_map(Op::Delete),
            1 => proptest::collection::vec(any::<usize>(), 0..6).prop_map(Op::Reorder),
            1 => any::<usize>().prop_map(Op::Update),
            1 => (0usize..5).prop_map(Op::Replace),
        ]
    }

    proptest! {
        #[test]
        fn order_is_contiguous_after_any_sequence(ops in proptest::collection::vec(op(), 0..40)) {
            let mut c = Collections::new();
            for (step, op) in ops.into_iter().enumerate() {
                let now = t(step as i64);
                let ids: Vec<RecordId> = c
                    .records(Category::Address)
                    .iter()
                    .map(|r| r.id.clone())
                    .collect();
                match op {
                    Op::Create => {
                        c.create(Category::Address, RecordDraft::named(format!("r{step}")), now);
                    }
                    Op::Delete(i) if !ids.is_empty() => {
                        c.delete(Category::Address, &ids[i % ids.len()], now).unwrap();
                    }
                    Op::Update(i) if !ids.is_empty() => {
                        c.update(Category::Address, &ids[i % ids.len()], RecordPatch::default(), now)
                            .unwrap();
                    }
                    Op::Reorder(picks) => {
                        let wanted: Vec<RecordId> = picks
                            .iter()
                            .filter(|_| !ids.is_empty())
                            .map(|i| ids[i % ids.len()].clone())
                            .collect();
                        c.reorder(Category::Address, &wanted, now);
                    }
                    Op::Replace(n) => {
                        let imported = (0..n)
                            .map(|i| ImportedRecord { name: format!("i{i}"), ..Default::default() })
                            .collect();
                        c.replace(Category::Address, imported, now).unwrap();
                    }
                    _ => {}
                }

                let orders: Vec<usize> = c.records(Category::Address).iter().map(|r| r.order).collect();
                let expected: Vec<usize> = (0..orders.len()).collect();
                prop_assert_eq!(orders, expected);
                let unique: HashSet<&RecordId> =
                    c.records(Category::Address).iter().map(|r| &r.id).collect();
                prop_assert_eq!(unique.len(), c.records(Category::Address).len());
            }
        }
    }
}
