/// A page cursor. `current_page` is 1-based and never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pager {
    current_page: u64,
    items_per_page: u64,
    total_results: u64,
    total_known: bool,
}

impl Pager {
    pub fn new(items_per_page: u64) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
            total_results: 0,
            total_known: false,
        }
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn items_per_page(&self) -> u64 {
        self.items_per_page
    }

    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    /// Zero-based index of the first item on the current page.
    pub fn offset(&self) -> u64 {
        (self.current_page - 1).saturating_mul(self.items_per_page)
    }

    /// SCIM style `startIndex` (1-based) of the current page.
    pub fn start_index(&self) -> u64 {
        self.offset().saturating_add(1)
    }

    pub fn page_count(&self) -> u64 {
        self.total_results.div_ceil(self.items_per_page).max(1)
    }

    pub fn set_total(&mut self, total_results: u64) {
        self.total_results = total_results;
        self.total_known = true;
    }

    /// Whether a fetch has reported the number of results yet.
    pub fn total_known(&self) -> bool {
        self.total_known
    }

    pub fn go_to(&mut self, page: u64) {
        self.current_page = page.max(1);
    }

    pub fn item_removed(&mut self) {
        self.total_results = self.total_results.saturating_sub(1);
    }

    /// Moves to the last page when the current one is past it. No-op until the total is known.
    pub fn clamp_to_last_page(&mut self) {
        if self.total_known {
            self.current_page = self.current_page.min(self.page_count());
        }
    }

    /// When the current page starts past the last result, moves back exactly one page.
    /// Returns whether it moved. Nothing happens before the total is known.
    pub fn step_back_if_past_end(&mut self) -> bool {
        if self.total_known && self.current_page > 1 && self.offset() >= self.total_results {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// The current page of an already fully loaded collection.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = usize::try_from(self.offset())
            .unwrap_or(usize::MAX)
            .min(items.len());
        let end = start
            .saturating_add(usize::try_from(self.items_per_page).unwrap_or(usize::MAX))
            .min(items.len());
        &items[start..end]
    }
}
