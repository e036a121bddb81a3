// ABOUTME: One-based pagination parameters and paged result envelope
// ABOUTME: Clamps out-of-range client input instead of erroring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! Pagination primitives for list endpoints.

use serde::{Deserialize, Serialize};

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size applied when the client sends none
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One-based page selection, as supplied by the client
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    /// Page number, first page is 1
    #[serde(default)]
    pub page: Option<u32>,
    /// Items per page
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PageParams {
    /// Normalized page number (minimum 1)
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Normalized page size, clamped to `1..=MAX_PAGE_SIZE`
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Zero-based offset of the first item on this page
    #[must_use]
    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.page_size()
    }
}

/// A page of items plus the totals needed for response headers
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total matching items across all pages
    pub total_count: u32,
    /// Total pages at the requested page size
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    /// Assemble a page, deriving `total_pages` by ceiling division
    #[must_use]
    pub fn new(items: Vec<T>, total_count: u32, page_size: u32) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            total_count.div_ceil(page_size.max(1))
        };
        Self {
            items,
            total_count,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams {
            page: None,
            page_size: None,
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = PageParams {
            page: Some(0),
            page_size: Some(10_000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_offset_arithmetic() {
        let params = PageParams {
            page: Some(3),
            page_size: Some(25),
        };
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        let result: PagedResult<u32> = PagedResult::new(vec![], 101, 10);
        assert_eq!(result.total_pages, 11);

        let result: PagedResult<u32> = PagedResult::new(vec![], 100, 10);
        assert_eq!(result.total_pages, 10);

        let result: PagedResult<u32> = PagedResult::new(vec![], 0, 10);
        assert_eq!(result.total_pages, 0);
    }
}
