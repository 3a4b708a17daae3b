//! Pagination module
//!
//! # Overview
//!
//! GitHub listings are page-numbered. The paginator walks pages from 1,
//! feeding each request through the retrying [`HttpClient`](crate::http::HttpClient),
//! and returns the concatenated items only once the listing has ended.

mod paginator;
mod types;

pub use paginator::{PageNumberPaginator, DEFAULT_PAGE_SIZE};
pub use types::{NextPage, Page, PaginationState};

#[cfg(test)]
mod tests;
