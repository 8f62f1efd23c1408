//! View projection: search, filter, sort, paginate
//!
//! Derives the exact slice of records to display from the full record set.
//! The steps always run in the same order:
//! 1. free-text search on the identifier
//! 2. column filters
//! 3. stable sort (nulls last in either direction)
//! 4. pagination (page size 0 = everything on one page)

use std::cmp::Ordering;

use roster_common::{Cell, Record};
use serde::{Deserialize, Serialize};

use crate::filter::FilterSet;

/// Page size meaning "show every row"
pub const PAGE_SIZE_ALL: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Active sort column and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Same column flips direction; a new column starts ascending
    pub fn toggle(&mut self, column: &str) {
        if self.column == column {
            self.direction = self.direction.reversed();
        } else {
            self.column = column.to_string();
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    /// Total number of pages, never below 1
    pub total_pages: usize,
    /// Index of the first row on the page
    pub offset: usize,
    /// Rows on the page
    pub len: usize,
}

/// Calculate pagination metadata from total results and requested page
///
/// Ensures page is within valid bounds [1, total_pages]. A page size of 0
/// puts every row on a single page.
///
/// # Examples
/// ```
/// use roster_dash::view::calculate_pagination;
///
/// // 250 total results at 100 per page = 3 pages (100 + 100 + 50)
/// let p = calculate_pagination(250, 2, 100);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(250, 99, 100);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.len, 50);
/// ```
pub fn calculate_pagination(
    total_results: usize,
    requested_page: usize,
    page_size: usize,
) -> Pagination {
    if page_size == PAGE_SIZE_ALL {
        return Pagination {
            page: 1,
            total_pages: 1,
            offset: 0,
            len: total_results,
        };
    }

    let total_pages = total_results.div_ceil(page_size).max(1);
    let page = requested_page.clamp(1, total_pages);
    let offset = (page - 1) * page_size;
    let len = total_results.saturating_sub(offset).min(page_size);

    Pagination {
        page,
        total_pages,
        offset,
        len,
    }
}

/// One rendered page plus the counts the pager needs
#[derive(Debug, Clone, PartialEq)]
pub struct Projection<'a> {
    pub rows: Vec<&'a Record>,
    pub total_matching: usize,
    pub total_pages: usize,
    /// Effective page after clamping
    pub page: usize,
}

/// Steps 1 and 2: identifier search then column filters, input order kept
pub fn matching<'a>(records: &'a [Record], query: &str, filters: &FilterSet) -> Vec<&'a Record> {
    let needle = query.to_lowercase();
    filters.apply(
        records
            .iter()
            .filter(|r| needle.is_empty() || r.name().to_lowercase().contains(&needle)),
    )
}

/// Stable sort; null sorts last regardless of direction
pub fn sort_rows(rows: &mut [&Record], sort: &SortSpec) {
    let column = sort.column.as_str();
    rows.sort_by(|a, b| {
        let (x, y) = (a.get(column), b.get(column));
        match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = compare_cells(x, y);
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            }
        }
    });
}

/// Native ordering for non-null cells; text compares case-insensitively.
/// Mixed kinds order numbers, then flags, then text.
pub fn compare_cells(a: Cell<'_>, b: Cell<'_>) -> Ordering {
    match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Cell::Text(x), Cell::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Cell::Flag(x), Cell::Flag(y)) => x.cmp(&y),
        (x, y) => kind_rank(x).cmp(&kind_rank(y)),
    }
}

fn kind_rank(cell: Cell<'_>) -> u8 {
    match cell {
        Cell::Number(_) => 0,
        Cell::Flag(_) => 1,
        Cell::Text(_) => 2,
        Cell::Null => 3,
    }
}

/// Full projection of the record set into one page
pub fn project<'a>(
    records: &'a [Record],
    query: &str,
    filters: &FilterSet,
    sort: &SortSpec,
    page: usize,
    page_size: usize,
) -> Projection<'a> {
    let mut rows = matching(records, query, filters);
    sort_rows(&mut rows, sort);

    let p = calculate_pagination(rows.len(), page, page_size);
    let total_matching = rows.len();
    let rows = rows.into_iter().skip(p.offset).take(p.len).collect();

    Projection {
        rows,
        total_matching,
        total_pages: p.total_pages,
        page: p.page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOperator, FilterSpec};
    use serde_json::Value;

    fn rec(name: &str, followers: Value) -> Record {
        Record::new()
            .with("name", name)
            .with("spotify_followers", followers)
    }

    fn names(rows: &[&Record]) -> Vec<String> {
        rows.iter().map(|r| r.name().to_string()).collect()
    }

    fn roster(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| rec(&format!("artist-{:03}", i), Value::from(i as u64)))
            .collect()
    }

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 2, 100);
        assert_eq!((p.page, p.total_pages, p.offset, p.len), (2, 3, 100, 100));
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(150, 0, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty_has_one_page() {
        let p = calculate_pagination(0, 3, 50);
        assert_eq!((p.page, p.total_pages, p.len), (1, 1, 0));
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = calculate_pagination(200, 2, 100);
        assert_eq!((p.page, p.total_pages, p.len), (2, 2, 100));
    }

    #[test]
    fn test_page_size_all_is_single_page() {
        for n in [0, 1, 7, 500] {
            let records = roster(n);
            let sort = SortSpec::new("name", SortDirection::Ascending);
            let proj = project(&records, "", &FilterSet::new(), &sort, 4, PAGE_SIZE_ALL);
            assert_eq!(proj.total_pages, 1);
            assert_eq!(proj.page, 1);
            assert_eq!(proj.rows.len(), n);
            assert_eq!(proj.total_matching, n);
        }
    }

    #[test]
    fn test_page_clamped_when_results_shrink() {
        let records = roster(30);
        let sort = SortSpec::new("name", SortDirection::Ascending);
        let mut filters = FilterSet::new();
        filters.set(
            "spotify_followers",
            FilterSpec::new(FilterOperator::LessThan, "12"),
        );

        let proj = project(&records, "", &filters, &sort, 3, 10);

        assert_eq!(proj.page, 2);
        assert_eq!(proj.total_pages, 2);
        assert_eq!(names(&proj.rows), vec!["artist-010", "artist-011"]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring_on_name() {
        let records = vec![
            rec("Daft Punk", Value::Null),
            rec("Punkrock Kids", Value::Null),
            rec("Adele", Value::Null),
        ];
        let sort = SortSpec::new("name", SortDirection::Ascending);
        let proj = project(&records, "PUNK", &FilterSet::new(), &sort, 1, 50);
        assert_eq!(names(&proj.rows), vec!["Daft Punk", "Punkrock Kids"]);
    }

    #[test]
    fn test_nulls_last_in_both_directions() {
        let records = vec![
            rec("a", Value::Null),
            rec("b", Value::from(5)),
            rec("c", Value::from(1)),
            rec("d", Value::Null),
        ];
        let filters = FilterSet::new();

        let asc = SortSpec::new("spotify_followers", SortDirection::Ascending);
        let proj = project(&records, "", &filters, &asc, 1, PAGE_SIZE_ALL);
        assert_eq!(names(&proj.rows), vec!["c", "b", "a", "d"]);

        let desc = SortSpec::new("spotify_followers", SortDirection::Descending);
        let proj = project(&records, "", &filters, &desc, 1, PAGE_SIZE_ALL);
        assert_eq!(names(&proj.rows), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let records = vec![
            rec("first", Value::from(1)),
            rec("second", Value::from(1)),
            rec("third", Value::from(0)),
            rec("fourth", Value::from(1)),
        ];
        let filters = FilterSet::new();

        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            let sort = SortSpec::new("spotify_followers", direction);
            let proj = project(&records, "", &filters, &sort, 1, PAGE_SIZE_ALL);
            let ones: Vec<String> = names(&proj.rows)
                .into_iter()
                .filter(|n| n != "third")
                .collect();
            assert_eq!(ones, vec!["first", "second", "fourth"]);
        }
    }

    #[test]
    fn test_text_sort_ignores_case() {
        let records = vec![
            rec("beta", Value::Null),
            rec("Alpha", Value::Null),
            rec("gamma", Value::Null),
        ];
        let sort = SortSpec::new("name", SortDirection::Ascending);
        let proj = project(&records, "", &FilterSet::new(), &sort, 1, PAGE_SIZE_ALL);
        assert_eq!(names(&proj.rows), vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_sort_toggle() {
        let mut sort = SortSpec::new("updated_at", SortDirection::Descending);
        sort.toggle("updated_at");
        assert_eq!(sort.direction, SortDirection::Ascending);
        sort.toggle("updated_at");
        assert_eq!(sort.direction, SortDirection::Descending);
        sort.toggle("name");
        assert_eq!(sort, SortSpec::new("name", SortDirection::Ascending));
    }

    #[test]
    fn test_mixed_kinds_put_numbers_first() {
        let records = vec![rec("t", Value::from("many")), rec("n", Value::from(3))];
        let sort = SortSpec::new("spotify_followers", SortDirection::Ascending);
        let proj = project(&records, "", &FilterSet::new(), &sort, 1, PAGE_SIZE_ALL);
        assert_eq!(names(&proj.rows), vec!["n", "t"]);
    }
}
