//! Client-side list-view pipeline: search/filter, pagination, derived
//! filter options, sorting, and export-set computation.
//!
//! Every function here is a pure transformation over an already-fetched
//! collection. Source order is preserved, records with missing or null
//! fields simply fail to match, and nothing in this module performs I/O
//! or returns an error.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{CollectionPage, FilterCriteria, FilteredView, Record};

/// Distinct non-null values of `field` across the collection, in
/// first-seen order. Used to populate filter choices from whatever data
/// is actually present, so a filter can never select an empty result
/// that the data does not contain.
pub fn derive_filter_options(records: &[Record], field: &str) -> Vec<String> {
    let mut options = Vec::new();
    for record in records {
        if let Some(value) = record.text(field) {
            if !options.contains(&value) {
                options.push(value);
            }
        }
    }
    options
}

/// Apply the active criteria to a collection.
///
/// A record is kept when the search term (if any) is a case-insensitive
/// substring of at least one searchable field, AND every non-blank
/// exact-match selection equals the record's value for that field
/// (case-sensitive, since selections come from values derived off the
/// data itself). Missing fields never match but never error.
pub fn apply_filters(
    records: &[Record],
    criteria: &FilterCriteria,
    searchable_fields: &[&str],
) -> Vec<Record> {
    records
        .iter()
        .filter(|record| matches_criteria(record, criteria, searchable_fields))
        .cloned()
        .collect()
}

/// The export set is the full filtered result, never the page slice:
/// pagination is a display concern, filtering is a data concern.
pub fn compute_export_set(
    records: &[Record],
    criteria: &FilterCriteria,
    searchable_fields: &[&str],
) -> Vec<Record> {
    apply_filters(records, criteria, searchable_fields)
}

fn matches_criteria(
    record: &Record,
    criteria: &FilterCriteria,
    searchable_fields: &[&str],
) -> bool {
    let term = criteria.search.trim().to_lowercase();
    if !term.is_empty() {
        let hit = searchable_fields.iter().any(|field| {
            record
                .text(field)
                .map(|value| value.to_lowercase().contains(&term))
                .unwrap_or(false)
        });
        if !hit {
            return false;
        }
    }

    criteria.selections.iter().all(|(field, selected)| {
        if selected.trim().is_empty() {
            return true;
        }
        record
            .text(field)
            .map(|value| value == *selected)
            .unwrap_or(false)
    })
}

/// Slice one page out of a filtered collection.
///
/// `total_pages` is at least 1 even for an empty set, and the requested
/// page is clamped into `[1, total_pages]` before slicing, so a caller
/// holding a stale page number still gets a valid view.
pub fn paginate(filtered: &[Record], page_size: usize, current_page: usize) -> FilteredView {
    let page_size = page_size.max(1);
    let total_filtered = filtered.len();
    let total_pages = total_filtered.div_ceil(page_size).max(1);
    let page = current_page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_filtered);
    let page_records = if start >= total_filtered {
        Vec::new()
    } else {
        filtered[start..end].to_vec()
    };

    FilteredView {
        page_records,
        total_pages,
        total_filtered,
    }
}

/// Build the view for an endpoint that paginates server-side. The fetched
/// records are already one page, so the criteria apply within that page
/// and the server's page count is carried through. The match total is the
/// server's collection count while no criteria are active; once a search
/// or filter narrows the page, it counts the matches actually shown.
pub fn server_page_view(
    page: CollectionPage,
    criteria: &FilterCriteria,
    searchable_fields: &[&str],
) -> FilteredView {
    let filtered = apply_filters(&page.records, criteria, searchable_fields);
    let total_filtered = if criteria.is_empty() {
        page.total_count.unwrap_or(filtered.len() as u64) as usize
    } else {
        filtered.len()
    };
    FilteredView {
        total_pages: page.total_pages.unwrap_or(1) as usize,
        total_filtered,
        page_records: filtered,
    }
}

/// Stable sort by one field. Values that both parse as dates compare
/// chronologically, otherwise lexicographically; records missing the
/// field always sort last, regardless of direction.
pub fn sort_by_field(records: &mut [Record], field: &str, descending: bool) {
    records.sort_by(|a, b| match (a.text(field), b.text(field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ordering = match (parse_timestamp(&x), parse_timestamp(&y)) {
                (Some(dx), Some(dy)) => dx.cmp(&dy),
                _ => x.cmp(&y),
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    });
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}
