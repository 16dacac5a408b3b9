use serde::Serialize;

/// Splits an ordered listing into fixed-size pages.
///
/// Page numbers are 1-based. A missing, non-numeric or non-positive request
/// resolves to the first page; a request beyond the end is clamped to the
/// last page. An empty listing still has one (empty) page.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: usize,
}

/// The slice of a listing a page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub count: u64,
    pub per_page: usize,
    pub offset: usize,
}

impl Paginator {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn window(&self, count: u64, requested: Option<&str>) -> PageWindow {
        let num_pages = (count as usize).div_ceil(self.per_page).max(1);
        let number = requested
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1)
            .min(num_pages);

        PageWindow {
            number,
            num_pages,
            count,
            per_page: self.per_page,
            offset: (number - 1) * self.per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: u64,
    pub per_page: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, object_list: Vec<T>) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        Self {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            per_page: window.per_page,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(window.number + 1),
            previous_page_number: has_previous.then(|| window.number - 1),
        }
    }
}
