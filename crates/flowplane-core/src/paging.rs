//! ---
//! fp_section: "02-workflow-lifecycle"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Deterministic pagination over ordered listings."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use flowplane_common::config::PagingConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Values substituted for non-positive page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefaults {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<&PagingConfig> for PageDefaults {
    fn from(config: &PagingConfig) -> Self {
        Self {
            page: config.default_page.max(1),
            page_size: config.default_page_size.max(1),
        }
    }
}

/// Caller supplied page coordinates; values `<= 0` mean "use the default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i32,
    pub page_size: i32,
}

impl PageRequest {
    pub fn new(page: i32, page_size: i32) -> Self {
        Self { page, page_size }
    }

    fn normalise(self, defaults: PageDefaults) -> (usize, usize) {
        let page = if self.page <= 0 {
            defaults.page
        } else {
            self.page as u32
        };
        let page_size = if self.page_size <= 0 {
            defaults.page_size
        } else {
            self.page_size as u32
        };
        (page.max(1) as usize, page_size.max(1) as usize)
    }
}

/// One bounded slice of a listing plus its position in the whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: u32,
    pub page: u32,
    pub pages: u32,
    pub total_count: u32,
}

impl<T> Page<T> {
    /// Transform the items while keeping the page coordinates.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            pages: self.pages,
            total_count: self.total_count,
        }
    }
}

/// Paginate with the built-in defaults (page 1, 15 items).
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    paginate_with(items, request, PageDefaults::default())
}

/// Cut the requested page out of `items`.
///
/// A page past the end is clamped to the last page. An empty listing yields
/// an empty first page with `pages == 0`.
pub fn paginate_with<T>(items: Vec<T>, request: PageRequest, defaults: PageDefaults) -> Page<T> {
    let (requested, page_size) = request.normalise(defaults);
    let total = items.len();
    let pages = total.div_ceil(page_size);
    if pages == 0 {
        return Page {
            items: Vec::new(),
            count: 0,
            page: 1,
            pages: 0,
            total_count: 0,
        };
    }

    let page = requested.min(pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total);
    let items: Vec<T> = items.into_iter().skip(start).take(end - start).collect();
    Page {
        count: items.len() as u32,
        items,
        page: page as u32,
        pages: pages as u32,
        total_count: total as u32,
    }
}
