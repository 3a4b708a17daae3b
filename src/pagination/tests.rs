//! Tests for pagination module

use super::*;
use crate::error::Error;
use crate::http::{ApiRequest, HttpClient, HttpClientConfig};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_client() -> HttpClient {
    let config = HttpClientConfig::builder()
        .max_attempts(3)
        .backoff_base(Duration::from_millis(10))
        .build();
    HttpClient::with_config(config).unwrap()
}

// ============================================================================
// State Tests
// ============================================================================

#[test]
fn test_pagination_state_default() {
    let state = PaginationState::new();
    assert_eq!(state.page, 1);
    assert_eq!(state.total_fetched, 0);
    assert!(!state.done);
}

#[test]
fn test_next_page_predicates() {
    assert!(NextPage::Done.is_done());
    assert!(NextPage::Continue(2).is_continue());
    assert!(!NextPage::Continue(2).is_done());
}

// ============================================================================
// PageNumberPaginator Tests
// ============================================================================

#[test]
fn test_process_page_full_page_continues() {
    let paginator = PageNumberPaginator::new(2);
    let mut state = PaginationState::new();

    assert_eq!(paginator.process_page(2, &mut state), NextPage::Continue(2));
    assert_eq!(state.page, 2);
    assert_eq!(state.total_fetched, 2);
    assert!(!state.done);
}

#[test]
fn test_process_page_short_or_empty_stops() {
    let paginator = PageNumberPaginator::new(100);

    let mut state = PaginationState::new();
    assert_eq!(paginator.process_page(42, &mut state), NextPage::Done);
    assert!(state.done);

    let mut state = PaginationState::new();
    assert_eq!(paginator.process_page(0, &mut state), NextPage::Done);
    assert_eq!(state.total_fetched, 0);
}

#[test]
fn test_page_request_sets_query() {
    let paginator = PageNumberPaginator::new(50);
    let base = ApiRequest::get("https://api.github.com/orgs/acme/teams?page=9").unwrap();
    let request = paginator.page_request(&base, &PaginationState::with_page(3));

    let query = request.url().query().unwrap_or_default().to_string();
    assert_eq!(query, "page=3&per_page=50");
}

#[test]
fn test_zero_page_size_is_clamped() {
    assert_eq!(PageNumberPaginator::new(0).page_size, 1);
    assert_eq!(PageNumberPaginator::default().page_size, DEFAULT_PAGE_SIZE);
}

#[test]
fn test_page_impls() {
    assert_eq!(vec![1, 2].into_items(), vec![1, 2]);
    assert_eq!(None::<Vec<u8>>.into_items(), Vec::<u8>::new());
    assert_eq!(json!([1, 2]).into_items(), vec![json!(1), json!(2)]);
    assert!(json!({"a": 1}).into_items().is_empty());
}

// ============================================================================
// Drain Tests
// ============================================================================

#[tokio::test]
async fn test_list_paged_full_then_short_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([3])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client();
    let request = ApiRequest::get(&format!("{}/items", mock_server.uri())).unwrap();
    let items: Vec<u32> = client.list_paged::<Vec<u32>>(&request, 2).await.unwrap();

    assert_eq!(items, vec![1, 2, 3]);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_paged_empty_first_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client();
    let request = ApiRequest::get(&format!("{}/items", mock_server.uri())).unwrap();
    let items = client.list_paged::<Vec<u32>>(&request, 2).await.unwrap();

    assert!(items.is_empty());
}

#[derive(Deserialize)]
struct Envelope {
    entries: Vec<String>,
}

impl Page for Envelope {
    type Item = String;

    fn into_items(self) -> Vec<String> {
        self.entries
    }
}

#[tokio::test]
async fn test_list_paged_envelope_with_retried_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wrapped"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entries": ["a", "b"]})))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wrapped"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wrapped"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entries": ["c"]})))
        .mount(&mock_server)
        .await;

    let client = fast_client();
    let request = ApiRequest::get(&format!("{}/wrapped", mock_server.uri())).unwrap();
    let items = client.list_paged::<Envelope>(&request, 2).await.unwrap();

    assert_eq!(items, vec!["a", "b", "c"]);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_paged_page_failure_fails_listing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&mock_server)
        .await;

    let client = fast_client();
    let request = ApiRequest::get(&format!("{}/items", mock_server.uri())).unwrap();
    let err = client
        .list_paged::<Vec<u32>>(&request, 2)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
}
