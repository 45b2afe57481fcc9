//! In-memory pagination applied to aggregation outputs at the boundary.

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

/// Window parameters as supplied by the caller; both optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A windowed slice of an ordered sequence plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Slice `items` into the requested window. Page numbering is 1-based; a
/// page past the end yields empty data with the metadata intact.
pub fn paginate<T>(items: Vec<T>, params: PageParams) -> Page<T> {
    let page = params.page.unwrap_or(DEFAULT_PAGE).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);

    let total = items.len();
    let total_pages = total.div_ceil(limit as usize) as u32;
    let start = (page as usize - 1) * limit as usize;
    let data: Vec<T> = items.into_iter().skip(start).take(limit as usize).collect();

    Page {
        data,
        total,
        page,
        limit,
        total_pages,
    }
}
