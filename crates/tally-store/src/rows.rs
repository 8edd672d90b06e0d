//! Rows-of-strings exchange format for bulk export and import.
//!
//! The spreadsheet codec lives outside the store; it hands over and receives
//! plain string grids in this layout:
//!
//! ```text
//! id | name | description | tags | created_at | updated_at | attr:<key>… | link:<category>…
//! ```
//!
//! Tags and link ids are joined with `", "`; a `,` or `\` inside an item is
//! escaped with a backslash. Attribute columns are the sorted union of keys
//! across the exported records, and an empty cell means the record has no
//! such attribute. Keys whose value is the empty string are listed in an
//! extra `empty_attributes` column, emitted only when some record needs it.
//! Link columns follow [`Category::ALL`] order, skipping the exported
//! category.
//!
//! Cell values are taken verbatim on import; only header names and list
//! items are trimmed.

use std::collections::{BTreeMap, BTreeSet};

use tally_types::{format_timestamp, parse_timestamp, Category, ImportedRecord, Record, RecordId};

use crate::error::{StoreError, StoreResult};

const ID: &str = "id";
const NAME: &str = "name";
const DESCRIPTION: &str = "description";
const TAGS: &str = "tags";
const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";
const EMPTY_ATTRIBUTES: &str = "empty_attributes";
const ATTR_PREFIX: &str = "attr:";
const LINK_PREFIX: &str = "link:";
const LIST_SEPARATOR: &str = ", ";

/// Header row followed by one row per record, in `order`.
pub fn export_rows(category: Category, records: &[Record]) -> Vec<Vec<String>> {
    let attribute_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.attributes.keys().map(String::as_str))
        .collect();
    let link_categories: Vec<Category> = category.others().collect();
    let has_empty_values = records
        .iter()
        .any(|record| record.attributes.values().any(String::is_empty));

    let mut header: Vec<String> = [ID, NAME, DESCRIPTION, TAGS, CREATED_AT, UPDATED_AT]
        .iter()
        .map(|column| column.to_string())
        .collect();
    header.extend(attribute_keys.iter().map(|key| format!("{ATTR_PREFIX}{key}")));
    if has_empty_values {
        header.push(EMPTY_ATTRIBUTES.to_string());
    }
    header.extend(link_categories.iter().map(|c| format!("{LINK_PREFIX}{c}")));

    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(header);
    for record in records {
        let mut row = vec![
            record.id.to_string(),
            record.name.clone(),
            record.description.clone().unwrap_or_default(),
            join_list(record.tags.iter().map(String::as_str)),
            format_timestamp(&record.created_at),
            format_timestamp(&record.updated_at),
        ];
        row.extend(
            attribute_keys
                .iter()
                .map(|key| record.attributes.get(*key).cloned().unwrap_or_default()),
        );
        if has_empty_values {
            row.push(join_list(
                record
                    .attributes
                    .iter()
                    .filter(|(_, value)| value.is_empty())
                    .map(|(key, _)| key.as_str()),
            ));
        }
        row.extend(link_categories.iter().map(|c| {
            record
                .links
                .get(c)
                .map(|ids| join_list(ids.iter().map(RecordId::as_str)))
                .unwrap_or_default()
        }));
        rows.push(row);
    }
    rows
}

enum Column {
    Id,
    Name,
    Description,
    Tags,
    CreatedAt,
    EmptyAttributes,
    Attribute(String),
    Link(Category),
    Ignored,
}

impl Column {
    fn from_header(header: &str) -> Self {
        let header = header.trim();
        if let Some(key) = header.strip_prefix(ATTR_PREFIX) {
            return match key.trim() {
                "" => Self::Ignored,
                key => Self::Attribute(key.to_string()),
            };
        }
        if let Some(category) = header.strip_prefix(LINK_PREFIX) {
            return category.parse().map(Self::Link).unwrap_or(Self::Ignored);
        }
        match header.to_ascii_lowercase().as_str() {
            ID => Self::Id,
            NAME => Self::Name,
            DESCRIPTION => Self::Description,
            TAGS => Self::Tags,
            CREATED_AT => Self::CreatedAt,
            EMPTY_ATTRIBUTES => Self::EmptyAttributes,
            _ => Self::Ignored,
        }
    }
}

/// Parse rows in the export layout into records for a bulk replace.
///
/// The first row is the header; it must contain a `name` column. Blank rows
/// are skipped. Row numbers in errors are zero-based and count the header.
pub fn records_from_rows(rows: &[Vec<String>]) -> StoreResult<Vec<ImportedRecord>> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<Column> = header.iter().map(|h| Column::from_header(h)).collect();
    if !columns.iter().any(|c| matches!(c, Column::Name)) {
        return Err(StoreError::InvalidRow {
            row: 0,
            reason: "header has no name column".into(),
        });
    }

    let mut imported = Vec::with_capacity(body.len());
    for (offset, row) in body.iter().enumerate() {
        let row_number = offset + 1;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut record = ImportedRecord::default();
        let mut links: BTreeMap<Category, Vec<RecordId>> = BTreeMap::new();
        let mut empty_keys = Vec::new();
        for (column, value) in columns.iter().zip(row.iter()) {
            match column {
                Column::Id if !value.trim().is_empty() => {
                    record.id = Some(RecordId::new(value.trim()))
                }
                Column::Name => record.name = value.clone(),
                Column::Description if !value.is_empty() => record.description = Some(value.clone()),
                Column::Tags => record.tags = split_list(value),
                Column::CreatedAt if !value.trim().is_empty() => {
                    let at = parse_timestamp(value.trim()).map_err(|e| StoreError::InvalidRow {
                        row: row_number,
                        reason: e.to_string(),
                    })?;
                    record.created_at = Some(at);
                }
                Column::Attribute(key) if !value.is_empty() => {
                    record.attributes.insert(key.clone(), value.clone());
                }
                Column::EmptyAttributes => empty_keys = split_list(value),
                Column::Link(category) => {
                    let ids: Vec<RecordId> = split_list(value).into_iter().map(RecordId::new).collect();
                    if !ids.is_empty() {
                        links.entry(*category).or_default().extend(ids);
                    }
                }
                _ => {}
            }
        }
        for key in empty_keys {
            record.attributes.entry(key).or_default();
        }

        if record.name.trim().is_empty() {
            return Err(StoreError::InvalidRow {
                row: row_number,
                reason: "name is blank".into(),
            });
        }
        record.links = links;
        imported.push(record);
    }
    Ok(imported)
}

fn join_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .map(|item| item.replace('\\', "\\\\").replace(',', "\\,"))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Split on unescaped commas, dropping blank items.
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            ',' => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    items.push(current);
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
