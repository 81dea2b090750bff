use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Page number, default 1.
    pub page: Option<i64>,
    /// Items per page, default 20, at most 100.
    #[serde(alias = "limit")]
    pub per_page: Option<i64>,
}

/// Highest page accepted, so `(page - 1) * per_page` cannot overflow.
pub const MAX_PAGE: i64 = i64::MAX / 100;

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

// Query strings are decoded by serde_urlencoded, which cannot combine
// `#[serde(flatten)]` with numeric fields, so pagination is repeated here.
#[derive(Debug, Default, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    /// Page number, default 1.
    pub page: Option<i64>,
    /// Items per page, default 20, at most 100.
    #[serde(alias = "limit")]
    pub per_page: Option<i64>,
    /// Exact status filter.
    pub status: Option<String>,
    /// Case-insensitive match on customer name or email.
    pub q: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
