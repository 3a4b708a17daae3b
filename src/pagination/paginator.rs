//! Page number pagination
//!
//! Requests `page=N&per_page=SIZE` starting at page 1. An empty page or a
//! page shorter than `SIZE` ends the listing.

use super::types::{NextPage, Page, PaginationState};
use crate::error::Result;
use crate::http::{ApiRequest, HttpClient};
use tracing::debug;

/// Default page size for GitHub listings
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Page number paginator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNumberPaginator {
    /// Query parameter name for page number
    pub page_param: String,
    /// Query parameter name for page size
    pub page_size_param: String,
    /// Page size value
    pub page_size: u32,
}

impl Default for PageNumberPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageNumberPaginator {
    /// Create a paginator using GitHub's `page` / `per_page` parameters
    ///
    /// A zero page size is treated as one.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_param: "page".to_string(),
            page_size_param: "per_page".to_string(),
            page_size: page_size.max(1),
        }
    }

    /// Build the request for the state's current page
    pub fn page_request(&self, base: &ApiRequest, state: &PaginationState) -> ApiRequest {
        base.clone()
            .with_query(&self.page_param, &state.page.to_string())
            .with_query(&self.page_size_param, &self.page_size.to_string())
    }

    /// Record a fetched page and decide whether another one follows
    pub fn process_page(&self, items: usize, state: &mut PaginationState) -> NextPage {
        state.add_fetched(items as u64);

        if items < self.page_size as usize {
            state.mark_done();
            return NextPage::Done;
        }

        state.next_page();
        NextPage::Continue(state.page)
    }

    /// Drain every page of `base` into one ordered sequence
    ///
    /// Any page failure fails the whole listing.
    pub async fn collect<P>(&self, client: &HttpClient, base: &ApiRequest) -> Result<Vec<P::Item>>
    where
        P: Page + serde::de::DeserializeOwned,
    {
        let mut state = PaginationState::new();
        let mut collected = Vec::new();

        while !state.done {
            let request = self.page_request(base, &state);
            let page: P = client.request_json(&request).await?;
            let items = page.into_items();
            let count = items.len();
            collected.extend(items);

            debug!(
                url = %base.url(),
                page = state.page,
                items = count,
                "Fetched page"
            );

            self.process_page(count, &mut state);
        }

        Ok(collected)
    }
}

impl HttpClient {
    /// Fetch every page of a page-numbered listing
    pub async fn list_paged<P>(&self, request: &ApiRequest, page_size: u32) -> Result<Vec<P::Item>>
    where
        P: Page + serde::de::DeserializeOwned,
    {
        PageNumberPaginator::new(page_size)
            .collect::<P>(self, request)
            .await
    }
}
