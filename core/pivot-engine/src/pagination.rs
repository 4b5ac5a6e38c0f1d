//! FILENAME: core/pivot-engine/src/pagination.rs
//! Pagination Engine - slices the ordered row set into pages.
//!
//! Invariant: `1 <= current_page <= total_pages`, and
//! `total_pages == max(1, ceil(row_count / page_size))`.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::definition::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Partial update for [`PaginationState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationConfig {
    pub current_page: Option<usize>,
    pub page_size: Option<usize>,
}

impl Default for PaginationState {
    fn default() -> Self {
        PaginationState::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginationState {
    /// A zero page size is treated as the default.
    pub fn new(page_size: usize) -> Self {
        PaginationState {
            current_page: 1,
            page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
            total_pages: 1,
        }
    }

    /// Recomputes `total_pages` for `row_count` rows and clamps the current page.
    pub fn update_row_count(&mut self, row_count: usize) {
        self.total_pages = row_count.div_ceil(self.page_size.max(1)).max(1);
        self.current_page = self.current_page.clamp(1, self.total_pages);
    }

    /// Applies a partial update. A page size of 0 rejects the whole update;
    /// a changed page size resets to page 1 unless a page is also given.
    /// Returns whether anything changed.
    pub fn set(&mut self, config: PaginationConfig, row_count: usize) -> bool {
        if config.page_size == Some(0) {
            return false;
        }
        let before = *self;

        if let Some(size) = config.page_size {
            if size != self.page_size {
                self.page_size = size;
                self.current_page = 1;
            }
        }
        self.update_row_count(row_count);
        if let Some(page) = config.current_page {
            self.current_page = page.clamp(1, self.total_pages);
        }

        *self != before
    }

    pub fn set_page_size(&mut self, page_size: usize, row_count: usize) -> bool {
        self.set(
            PaginationConfig {
                page_size: Some(page_size),
                current_page: None,
            },
            row_count,
        )
    }

    /// Moves to `page`, clamped into `[1, total_pages]`.
    pub fn go_to(&mut self, page: usize) -> bool {
        let target = page.clamp(1, self.total_pages);
        if target == self.current_page {
            return false;
        }
        self.current_page = target;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current_page.saturating_add(1))
    }

    pub fn previous(&mut self) -> bool {
        self.go_to(self.current_page.saturating_sub(1))
    }

    /// Index range of the current page within `row_count` rows.
    pub fn page_range(&self, row_count: usize) -> Range<usize> {
        let start = self.current_page.saturating_sub(1).saturating_mul(self.page_size).min(row_count);
        let end = start.saturating_add(self.page_size).min(row_count);
        start..end
    }
}
