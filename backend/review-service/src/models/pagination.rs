//! Paging, multi-key sorting and text-search helpers shared by every listing.

use crate::error::{AppError, Result};
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// 1-based page request, clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    pub fn limit_i64(&self) -> i64 {
        self.limit as i64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
        }
    }

    /// Paginate an already filtered and sorted collection in memory
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Self::new(items, total, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Rating,
    Status,
    Type,
    Reason,
}

impl SortField {
    fn from_api(name: &str) -> Option<Self> {
        match name {
            "createdAt" | "created_at" => Some(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Some(SortField::UpdatedAt),
            "rating" => Some(SortField::Rating),
            "status" => Some(SortField::Status),
            "type" => Some(SortField::Type),
            "reason" => Some(SortField::Reason),
            _ => None,
        }
    }

    /// Column name; only ever interpolated from this whitelist
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Rating => "rating",
            SortField::Status => "status",
            SortField::Type => "report_type",
            SortField::Reason => "reason",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Records that can be ordered in memory by a [`Sort`]
pub trait Sortable {
    fn compare_field(&self, other: &Self, field: SortField) -> Ordering;
    fn sort_id(&self) -> Uuid;
}

/// Ordered list of sort keys, e.g. `status:asc,createdAt:desc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort(Vec<SortKey>);

impl Default for Sort {
    fn default() -> Self {
        Sort(vec![SortKey {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }])
    }
}

impl Sort {
    /// Parse a sort expression against the fields a listing allows.
    ///
    /// A missing or blank expression yields `createdAt DESC`. A key without a
    /// direction sorts ascending.
    pub fn parse(raw: Option<&str>, allowed: &[SortField]) -> Result<Self> {
        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Sort::default()),
        };

        let mut keys = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, direction) = match part.split_once(':') {
                Some((name, dir)) => (name.trim(), dir.trim()),
                None => (part, "asc"),
            };

            let field = SortField::from_api(name)
                .filter(|f| allowed.contains(f))
                .ok_or_else(|| AppError::InvalidInput(format!("Cannot sort by '{}'", name)))?;

            let direction = match direction.to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => {
                    return Err(AppError::InvalidInput(format!(
                        "Invalid sort direction '{}'",
                        other
                    )))
                }
            };

            if !keys.iter().any(|k: &SortKey| k.field == field) {
                keys.push(SortKey { field, direction });
            }
        }

        if keys.is_empty() {
            return Ok(Sort::default());
        }
        Ok(Sort(keys))
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    /// `ORDER BY` body with a stable id tie-breaker
    pub fn order_by(&self) -> String {
        let mut parts: Vec<String> = self
            .0
            .iter()
            .map(|k| format!("{} {}", k.field.column(), k.direction.sql()))
            .collect();
        parts.push("id ASC".to_string());
        parts.join(", ")
    }

    pub fn compare<T: Sortable>(&self, a: &T, b: &T) -> Ordering {
        self.0
            .iter()
            .map(|k| k.direction.apply(a.compare_field(b, k.field)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.sort_id().cmp(&b.sort_id()))
    }

    pub fn sort_slice<T: Sortable>(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

/// ILIKE pattern matching `needle` anywhere, with wildcards escaped
pub fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Trimmed search term, `None` when blank
pub fn normalize_search(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Case-insensitive substring match used by the in-memory paths
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW_FIELDS: &[SortField] = &[
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::Rating,
    ];

    #[test]
    fn test_default_sort_is_newest_first() {
        let sort = Sort::parse(None, REVIEW_FIELDS).unwrap();
        assert_eq!(sort.order_by(), "created_at DESC, id ASC");

        let blank = Sort::parse(Some("  "), REVIEW_FIELDS).unwrap();
        assert_eq!(blank, Sort::default());
    }

    #[test]
    fn test_multi_key_sort() {
        let sort = Sort::parse(Some("rating:desc, createdAt"), REVIEW_FIELDS).unwrap();
        assert_eq!(sort.order_by(), "rating DESC, created_at ASC, id ASC");
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let sort = Sort::parse(Some("rating:desc,rating:asc"), REVIEW_FIELDS).unwrap();
        assert_eq!(sort.keys().len(), 1);
        assert_eq!(sort.keys()[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_rejects_unlisted_fields_and_directions() {
        assert!(matches!(
            Sort::parse(Some("reason:asc"), REVIEW_FIELDS),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            Sort::parse(Some("id; DROP TABLE reviews"), REVIEW_FIELDS),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            Sort::parse(Some("rating:sideways"), REVIEW_FIELDS),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_page_request_bounds() {
        let req = PageRequest::new(Some(0), Some(1000));
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, MAX_LIMIT);
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_slice_pages_in_memory() {
        let page = Page::slice((1..=25).collect::<Vec<_>>(), PageRequest::new(Some(3), Some(10)));
        assert_eq!(page.total, 25);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert!(contains_ci("Great SHOW", "show"));
    }

    #[test]
    fn test_blank_search_is_dropped() {
        assert_eq!(normalize_search(Some("   ".into())), None);
        assert_eq!(normalize_search(Some(" heat ".into())), Some("heat".into()));
        assert_eq!(normalize_search(None), None);
    }
}
