//! Filter, sort and paginate pipeline backing the dashboard table.
//!
//! Everything here is a pure function of the dataset and a [`ViewState`];
//! callers replace the state wholesale on every interaction and recompute the
//! whole view from scratch.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use icu_collator::{Collator, CollatorOptions, Strength};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DomainRecord, Field, FieldKind, FieldValue};

/// Number of records shown per page.
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Returns the wire representation used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = ParseDirectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(Self::Ascending),
            "desc" => Ok(Self::Descending),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sort direction must be 'asc' or 'desc' (got {0})")]
pub struct ParseDirectionError(pub String);

/// Active sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: Field,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: Field) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: Field) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }
}

/// Pagination control activated by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNav {
    First,
    Previous,
    Next,
    Last,
}

/// Filter text, sort specification and current page driving the visible slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub filter_text: String,
    pub sort: Option<SortSpec>,
    pub page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            filter_text: String::new(),
            sort: None,
            page: 1,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the filter text. The page goes back to the first one.
    pub fn with_filter(&self, text: impl Into<String>) -> Self {
        Self {
            filter_text: text.into(),
            sort: self.sort,
            page: 1,
        }
    }

    /// Applies a header click on `field`.
    ///
    /// A new key sorts ascending; the active key flips its direction. Once a
    /// key has been chosen the state never returns to "no sort".
    pub fn toggle_sort(&self, field: Field) -> Self {
        let sort = match self.sort {
            Some(current) if current.field == field => SortSpec {
                field,
                direction: current.direction.flip(),
            },
            _ => SortSpec::ascending(field),
        };
        Self {
            filter_text: self.filter_text.clone(),
            sort: Some(sort),
            page: self.page,
        }
    }

    /// Moves to another page, clamped to `[1, total_pages]`.
    pub fn navigate(&self, nav: PageNav, total_pages: usize) -> Self {
        let last = total_pages.max(1);
        let page = match nav {
            PageNav::First => 1,
            PageNav::Previous => self.page.saturating_sub(1),
            PageNav::Next => self.page.saturating_add(1),
            PageNav::Last => last,
        };
        Self {
            filter_text: self.filter_text.clone(),
            sort: self.sort,
            page: page.clamp(1, last),
        }
    }
}

/// Column rendered in the table header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: Field,
    pub label: String,
    pub kind: FieldKind,
}

impl Column {
    fn from_field(field: Field) -> Self {
        Self {
            key: field,
            label: field.label(),
            kind: field.kind(),
        }
    }
}

/// Page bookkeeping for a filtered and sorted sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    pub page_size: usize,
}

impl Pagination {
    /// Computes page counts for `total_rows`, clamping `requested_page`.
    pub fn new(total_rows: usize, requested_page: usize) -> Self {
        let total_pages = total_rows.div_ceil(PAGE_SIZE).max(1);
        Self {
            current_page: requested_page.clamp(1, total_pages),
            total_pages,
            total_rows,
            page_size: PAGE_SIZE,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Index range of the current page within the full sequence.
    pub fn range(&self) -> Range<usize> {
        let start = (self.current_page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.total_rows);
        start.min(end)..end
    }
}

/// Result of running the pipeline once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView<'a> {
    pub columns: Vec<Column>,
    pub rows: Vec<&'a DomainRecord>,
    pub pagination: Pagination,
    /// State with the page clamped to the valid range.
    pub state: ViewState,
}

/// Derives the displayed columns from the dataset.
pub fn columns_for(records: &[DomainRecord]) -> Vec<Column> {
    if records.is_empty() {
        return Vec::new();
    }
    Field::ALL.into_iter().map(Column::from_field).collect()
}

/// Keeps records where any value contains `text`, ignoring case.
pub fn filter_records<'a>(records: &'a [DomainRecord], text: &str) -> Vec<&'a DomainRecord> {
    if text.is_empty() {
        return records.iter().collect();
    }

    let needle = text.to_lowercase();
    records
        .iter()
        .filter(|record| {
            record
                .values()
                .any(|value| value.to_string().to_lowercase().contains(&needle))
        })
        .collect()
}

/// Stable sort by `spec`; `None` leaves the order untouched.
pub fn sort_records(rows: &mut [&DomainRecord], spec: Option<SortSpec>) {
    let Some(spec) = spec else {
        return;
    };

    let collator = text_collator();
    rows.sort_by(|a, b| {
        let ordering = compare_by(a, b, spec.field, collator.as_ref());
        match spec.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

/// Root-locale collator at secondary strength: accents count, case does not.
fn text_collator() -> Option<Collator> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Secondary);
    Collator::try_new(&Default::default(), options).ok()
}

fn compare_by(
    a: &DomainRecord,
    b: &DomainRecord,
    field: Field,
    collator: Option<&Collator>,
) -> Ordering {
    match (a.value(field), b.value(field)) {
        (FieldValue::Number(left), FieldValue::Number(right)) => left.cmp(&right),
        (left, right) => {
            let (left, right) = (left.to_string(), right.to_string());
            match collator {
                Some(collator) => collator.compare(&left, &right),
                None => left.to_lowercase().cmp(&right.to_lowercase()),
            }
        }
    }
}

/// Slices out the requested page, clamped to the valid range.
pub fn paginate<'a>(
    rows: &[&'a DomainRecord],
    requested_page: usize,
) -> (Vec<&'a DomainRecord>, Pagination) {
    let pagination = Pagination::new(rows.len(), requested_page);
    (rows[pagination.range()].to_vec(), pagination)
}

/// Runs filter, sort and paginate over `records` for `state`.
pub fn compute_view<'a>(records: &'a [DomainRecord], state: &ViewState) -> TableView<'a> {
    let mut rows = filter_records(records, &state.filter_text);
    sort_records(&mut rows, state.sort);

    let (visible, pagination) = paginate(&rows, state.page);

    TableView {
        columns: columns_for(records),
        rows: visible,
        pagination,
        state: ViewState {
            filter_text: state.filter_text.clone(),
            sort: state.sort,
            page: pagination.current_page,
        },
    }
}
