//! # Binding Resolver
//!
//! Expands the element set against an imported table into one value sequence
//! per element, and derives how many pages the batch has.
//!
//! ## Rules
//!
//! - static element: one value, repeated on every page
//! - bound element: the column's values, one per page
//! - `page_count = max(1, longest bound column)`
//! - a bound element whose column ran out renders `""` on the remaining pages
//! - a bound element whose column is missing renders `""` on every page
//!
//! ```text
//! Name  = [Alice, Bob, Carol]       page:  0      1     2     3     4
//! Sku   = [A1, B2, C3, D4, E5]      Name:  Alice  Bob   Carol ""    ""
//!                                   Sku:   A1     B2    C3    D4    E5
//! ```

use std::collections::HashMap;

use log::warn;

use crate::element::{ColumnRef, Element, ElementId, ValueSource};
use crate::table::ImportedTable;

/// Values an element takes across pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSequence {
    /// Same value on every page.
    Fixed(String),
    /// One value per page; pages past the end resolve to `""`.
    Column(Vec<String>),
}

impl ValueSequence {
    /// Value on page `page`.
    pub fn value_at(&self, page: usize) -> &str {
        match self {
            ValueSequence::Fixed(value) => value,
            ValueSequence::Column(values) => values.get(page).map(String::as_str).unwrap_or(""),
        }
    }

    /// Effective sequence length (1 for fixed values).
    pub fn len(&self) -> usize {
        match self {
            ValueSequence::Fixed(_) => 1,
            ValueSequence::Column(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Non-fatal binding problems found while resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingIssue {
    /// A bound element references a column absent from the table.
    MissingBinding { element: ElementId, column: ColumnRef },
    /// A bound column is shorter than the page count; its elements go blank.
    ColumnLengthMismatch {
        column: ColumnRef,
        len: usize,
        page_count: usize,
    },
}

/// Result of resolving an element set against a table.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    sequences: HashMap<ElementId, ValueSequence>,
    page_count: usize,
    issues: Vec<BindingIssue>,
}

impl Resolution {
    /// Number of pages the batch renders to (at least 1).
    pub fn page_count(&self) -> usize {
        self.page_count.max(1)
    }

    pub fn sequence(&self, id: ElementId) -> Option<&ValueSequence> {
        self.sequences.get(&id)
    }

    /// Value of element `id` on `page`. Unknown elements resolve to `""`.
    pub fn value(&self, id: ElementId, page: usize) -> &str {
        self.sequences
            .get(&id)
            .map(|seq| seq.value_at(page))
            .unwrap_or("")
    }

    pub fn issues(&self) -> &[BindingIssue] {
        &self.issues
    }
}

/// Resolve every element's value sequence and the overall page count.
pub fn resolve<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
    table: &ImportedTable,
) -> Resolution {
    let mut sequences = HashMap::new();
    let mut issues = Vec::new();
    let mut page_count = 1usize;
    // Bound columns in first-seen order, for the length diagnostics below.
    let mut bound_columns: Vec<(ColumnRef, usize)> = Vec::new();

    for element in elements {
        let sequence = match element.value_source() {
            None => continue,
            Some(ValueSource::Static(content)) => ValueSequence::Fixed(content.clone()),
            Some(ValueSource::Bound(column_ref)) => match table.column(column_ref.name()) {
                Some(column) => {
                    page_count = page_count.max(column.len());
                    if !bound_columns.iter().any(|(c, _)| c == column_ref) {
                        bound_columns.push((column_ref.clone(), column.len()));
                    }
                    ValueSequence::Column(column.values.clone())
                }
                None => {
                    warn!(
                        "element {} is bound to missing column '{}', rendering blank",
                        element.id(),
                        column_ref
                    );
                    issues.push(BindingIssue::MissingBinding {
                        element: element.id(),
                        column: column_ref.clone(),
                    });
                    ValueSequence::Fixed(String::new())
                }
            },
        };
        sequences.insert(element.id(), sequence);
    }

    for (column, len) in bound_columns {
        if len < page_count {
            warn!(
                "column '{}' has {} value(s) for {} page(s), later pages render blank",
                column, len, page_count
            );
            issues.push(BindingIssue::ColumnLengthMismatch {
                column,
                len,
                page_count,
            });
        }
    }

    Resolution {
        sequences,
        page_count,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Geometry;
    use crate::table::Column;
    use pretty_assertions::assert_eq;

    fn geom() -> Geometry {
        Geometry::new(0.0, 0.0, 50.0, 50.0)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_static_only_single_page() {
        let el = Element::text(ValueSource::fixed("Warehouse A"), geom()).unwrap();
        let res = resolve([&el], &ImportedTable::new());
        assert_eq!(res.page_count(), 1);
        assert_eq!(res.value(el.id(), 0), "Warehouse A");
        assert!(res.issues().is_empty());
    }

    #[test]
    fn test_static_constant_across_pages() {
        let fixed = Element::text(ValueSource::fixed("HQ"), geom()).unwrap();
        let bound = Element::qr_code(ValueSource::column("Name"), geom()).unwrap();
        let table = ImportedTable::from_columns([Column::new("Name", strings(&["a", "b", "c"]))]);
        let res = resolve([&fixed, &bound], &table);
        for page in 0..res.page_count() + 2 {
            assert_eq!(res.value(fixed.id(), page), "HQ");
        }
    }

    #[test]
    fn test_bound_values_per_page() {
        let el = Element::qr_code(ValueSource::column("Name"), geom()).unwrap();
        let table = ImportedTable::from_columns([Column::new("Name", strings(&["Alice", "Bob"]))]);
        let res = resolve([&el], &table);
        assert_eq!(res.page_count(), 2);
        assert_eq!(res.value(el.id(), 0), "Alice");
        assert_eq!(res.value(el.id(), 1), "Bob");
        assert_eq!(res.value(el.id(), 2), "");
    }

    #[test]
    fn test_mismatched_lengths_use_max() {
        let short = Element::text(ValueSource::column("Short"), geom()).unwrap();
        let long = Element::barcode(ValueSource::column("Long"), geom()).unwrap();
        let table = ImportedTable::from_columns([
            Column::new("Short", strings(&["1", "2", "3"])),
            Column::new("Long", strings(&["a", "b", "c", "d", "e"])),
        ]);
        let res = resolve([&short, &long], &table);
        assert_eq!(res.page_count(), 5);
        assert_eq!(res.value(short.id(), 4), "");
        assert_eq!(res.value(long.id(), 4), "e");
        assert_eq!(
            res.issues(),
            &[BindingIssue::ColumnLengthMismatch {
                column: ColumnRef::new("Short"),
                len: 3,
                page_count: 5,
            }]
        );
    }

    #[test]
    fn test_missing_column_isolated() {
        let missing = Element::text(ValueSource::column("Nope"), geom()).unwrap();
        let ok = Element::text(ValueSource::column("Name"), geom()).unwrap();
        let table = ImportedTable::from_columns([Column::new("Name", strings(&["x", "y"]))]);
        let res = resolve([&missing, &ok], &table);
        assert_eq!(res.page_count(), 2);
        assert_eq!(res.value(missing.id(), 0), "");
        assert_eq!(res.value(missing.id(), 1), "");
        assert_eq!(res.sequence(missing.id()).map(ValueSequence::len), Some(1));
        assert!(matches!(
            res.issues(),
            [BindingIssue::MissingBinding { element, .. }] if *element == missing.id()
        ));
    }

    #[test]
    fn test_empty_column_still_one_page() {
        let el = Element::text(ValueSource::column("Empty"), geom()).unwrap();
        let table = ImportedTable::from_columns([Column::new("Empty", vec![])]);
        let res = resolve([&el], &table);
        assert_eq!(res.page_count(), 1);
        assert_eq!(res.value(el.id(), 0), "");
    }

    #[test]
    fn test_images_have_no_sequence() {
        let img = Element::image("logo.png", geom()).unwrap();
        let res = resolve([&img], &ImportedTable::new());
        assert!(res.sequence(img.id()).is_none());
        assert_eq!(res.page_count(), 1);
    }

    #[test]
    fn test_page_count_property() {
        // page_count == max(1, longest referenced column); unreferenced columns don't count
        let a = Element::text(ValueSource::column("A"), geom()).unwrap();
        let table = ImportedTable::from_columns([
            Column::new("A", strings(&["1", "2"])),
            Column::new("Unused", strings(&["1", "2", "3", "4", "5", "6"])),
        ]);
        assert_eq!(resolve([&a], &table).page_count(), 2);
    }
}
