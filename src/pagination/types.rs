//! Pagination types and traits
//!
//! Defines the page payload abstraction and the cursor state of one drain.

use serde_json::Value;

/// Result of the next page computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// Request this page number next
    Continue(u32),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// A decoded page payload
///
/// Listings either return a bare JSON array or wrap the items in an
/// envelope object; implementors hand back the items in server order.
pub trait Page {
    /// Item type yielded by the page
    type Item;

    /// Consume the payload, returning its items
    fn into_items(self) -> Vec<Self::Item>;
}

impl<T> Page for Vec<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self
    }
}

/// A `null` body is an empty page
impl<P: Page> Page for Option<P> {
    type Item = P::Item;

    fn into_items(self) -> Vec<P::Item> {
        self.map(Page::into_items).unwrap_or_default()
    }
}

/// Raw JSON page: an array yields its elements, anything else is empty
impl Page for Value {
    type Item = Value;

    fn into_items(self) -> Vec<Value> {
        match self {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }
}

/// Tracks pagination state during one drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    /// Page number to request next
    pub page: u32,
    /// Total items fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::with_page(1)
    }
}

impl PaginationState {
    /// Create a new pagination state starting at page 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state with a starting page
    pub fn with_page(page: u32) -> Self {
        Self {
            page,
            total_fetched: 0,
            done: false,
        }
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Increment page number
    pub fn next_page(&mut self) {
        self.page += 1;
    }

    /// Add to total fetched
    pub fn add_fetched(&mut self, count: u64) {
        self.total_fetched += count;
    }
}
