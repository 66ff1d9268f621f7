use serde::{Deserialize, Serialize};

use super::FieldError;
use crate::config::PaginationConfig;
use crate::error::ApiError;

/// Raw `page` / `limit` query parameters. Kept as strings so that `page=0`
/// and `page=abc` both surface as field-level validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl PageRequest {
    pub fn from_query(query: &PageQuery, config: &PaginationConfig) -> Result<Self, ApiError> {
        let mut errors = Vec::new();

        let page = parse_positive("page", query.page.as_deref(), 1, &mut errors);
        let limit = parse_positive("limit", query.limit.as_deref(), config.default_limit, &mut errors);

        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }

        Ok(Self {
            page,
            limit: limit.min(config.max_limit.max(1)),
        })
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.limit as usize)
    }
}

fn parse_positive(field: &str, raw: Option<&str>, default: u32, errors: &mut Vec<FieldError>) -> u32 {
    match raw.map(str::trim) {
        None | Some("") => default,
        Some(s) => match s.parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => {
                errors.push(FieldError::new(field, format!("{} must be a positive integer", field)));
                default
            }
        },
    }
}

/// Slice an already-filtered, ordered list. Pages past the end are empty,
/// not an error, and echo the requested page number.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let total_pages = if total == 0 {
        0
    } else {
        ((total + request.limit as usize - 1) / request.limit as usize) as u32
    };

    let items = items
        .into_iter()
        .skip(request.offset())
        .take(request.limit as usize)
        .collect();

    Page {
        items,
        pagination: Pagination {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_limit: 20,
            max_limit: 50,
        }
    }

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn defaults_apply_when_absent() {
        let req = PageRequest::from_query(&query(None, None), &config()).unwrap();
        assert_eq!(req, PageRequest { page: 1, limit: 20 });
    }

    #[test]
    fn zero_or_garbage_is_rejected_per_field() {
        let err = PageRequest::from_query(&query(Some("0"), Some("0")), &config()).unwrap_err();
        match err {
            ApiError::Validation { details, .. } => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["page", "limit"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(PageRequest::from_query(&query(Some("abc"), None), &config()).is_err());
        assert!(PageRequest::from_query(&query(Some("-1"), None), &config()).is_err());
    }

    #[test]
    fn limit_is_clamped_to_max() {
        let req = PageRequest::from_query(&query(Some("2"), Some("500")), &config()).unwrap();
        assert_eq!(req.limit, 50);
    }

    #[test]
    fn exact_fit_is_one_page() {
        let page = paginate((0..10).collect::<Vec<_>>(), PageRequest { page: 1, limit: 10 });
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.pagination.total, 10);
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[test]
    fn page_beyond_range_is_empty_and_echoed() {
        let page = paginate((0..10).collect::<Vec<_>>(), PageRequest { page: 99, limit: 10 });
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.page, 99);
        assert_eq!(page.pagination.total, 10);
    }

    #[test]
    fn last_partial_page() {
        let page = paginate((0..25).collect::<Vec<_>>(), PageRequest { page: 3, limit: 10 });
        assert_eq!(page.items, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.pagination.total_pages, 3);
    }
}
