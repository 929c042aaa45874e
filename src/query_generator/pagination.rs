//! Pager compilation: page limits and the `(offset, limit)` window handed to backends.

use crate::qr_parser::document::{Pager, DEFAULT_PAGE_SIZE};

/// Page size limits of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageLimits {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        PageLimits {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: 500,
        }
    }
}

/// `(offset, limit)` pair handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

/// Compile a pager. `page` is clamped to at least 1 and `size` to `1..=max_size`.
pub fn page_window(pager: &Pager, limits: &PageLimits) -> PageWindow {
    let max_size = limits.max_size.max(1);
    let size = pager
        .size
        .unwrap_or(limits.default_size)
        .clamp(1, max_size);
    let page = pager.page.max(1);
    if pager.size.is_some_and(|s| s > max_size) {
        log::debug!("page size {:?} clamped to {}", pager.size, max_size);
    }
    PageWindow {
        offset: (page - 1).saturating_mul(size),
        limit: size,
    }
}
