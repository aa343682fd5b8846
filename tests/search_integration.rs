//! Integration tests for directory search and record extraction.

use facescrape_core::{
    AuthSession, ClientOptions, Credentials, DirectorySearchClient, ErrorKind, FetchCause,
    RecordExtractor, RecordId, ScrapeClient, ScrapeError, SearchFilter, SiteProfile,
};
use wiremock::matchers::{header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;
use support::{GOOD_PASSWORD, mount_cas, record_page, result_entry, scraper_for};

async fn mount_search(server: &MockServer, ids: &[&str]) {
    let body: String = ids.iter().map(|id| result_entry(id)).collect();
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("num", "9999"))
        .and(query_param("view", "photo"))
        .and(header_regex("cookie", "PHPSESSID=sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_record(server: &MockServer, id: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path("/individual"))
        .and(query_param("id", id))
        .and(header_regex("cookie", "PHPSESSID=sess-1"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_before_login_sends_no_request() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut scraper = scraper_for(&server, GOOD_PASSWORD);
    let err = scraper.search(&SearchFilter::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);

    let site = SiteProfile::with_base_url(&server.uri());
    let client = ScrapeClient::with_options(&ClientOptions::default()).unwrap();
    let mut session = AuthSession::new(Credentials::new("12345678", GOOD_PASSWORD), &site);
    let err = DirectorySearchClient::new(&client, &site)
        .search(&mut session, &SearchFilter::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);

    let err = RecordExtractor::new(&client, &site)
        .fetch(&mut session, &RecordId::new("ab12"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
}

#[tokio::test]
async fn test_search_returns_ids_in_page_order_and_sends_filter() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_cas(&server).await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("house", "Kirkland House"))
        .and(query_param("num", "9999"))
        .and(query_param("dorm", "Weld"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{}{}{}",
            result_entry("cc03"),
            result_entry("aa01"),
            result_entry("bb02")
        )))
        .expect(1)
        .mount(&server)
        .await;

    let site = SiteProfile::with_base_url(&server.uri());
    let client = ScrapeClient::new().unwrap();
    let mut session = AuthSession::new(Credentials::new("12345678", GOOD_PASSWORD), &site);
    session.login(&client, &site).await.unwrap();

    let filter = SearchFilter::new().house("Kirkland House").with("dorm", "Weld");
    let ids = DirectorySearchClient::new(&client, &site)
        .search(&mut session, &filter)
        .await
        .unwrap();
    let ids: Vec<&str> = ids.iter().map(RecordId::as_str).collect();
    assert_eq!(ids, vec!["cc03", "aa01", "bb02"]);
}

#[tokio::test]
async fn test_search_with_no_results_is_empty_not_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_cas(&server).await;
    mount_search(&server, &[]).await;

    let mut scraper = scraper_for(&server, GOOD_PASSWORD);
    scraper.login().await.unwrap();
    let outcome = scraper.search(&SearchFilter::new()).await.unwrap();
    assert_eq!(outcome.total(), 0);
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn test_full_scrape_extracts_records_and_tolerates_missing_fields() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_cas(&server).await;
    mount_search(&server, &["aa01", "bb02"]).await;
    mount_record(
        &server,
        "aa01",
        200,
        record_page("Jane Doe", "Kirkland House", Some("Physics"), "jdoe@college.harvard.edu"),
    )
    .await;
    mount_record(
        &server,
        "bb02",
        200,
        record_page("Sam Roe", "Quincy House", None, "sroe@college.harvard.edu"),
    )
    .await;

    let mut scraper = scraper_for(&server, GOOD_PASSWORD);
    let mut progress = Vec::new();
    scraper.login().await.unwrap();
    let outcome = scraper
        .search_with_progress(&SearchFilter::new(), |done, total| progress.push((done, total)))
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(progress, vec![(1, 2), (2, 2)]);
    let [jane, sam] = outcome.records.as_slice() else {
        panic!("expected two records, got {}", outcome.records.len());
    };
    assert_eq!(jane.get("name"), Some("Jane Doe"));
    assert_eq!(jane.get("concentration"), Some("Physics"));
    assert_eq!(jane.get("dorm address"), Some("Weld 12Cambridge"));
    assert_eq!(
        jane.get("photo").map(|url| url.starts_with(&server.uri())),
        Some(true)
    );
    assert_eq!(sam.get("name"), Some("Sam Roe"));
    assert_eq!(sam.get("concentration"), None);
    assert_eq!(sam.get("email"), Some("sroe@college.harvard.edu"));
    assert_eq!(scraper.last_read().len(), 2);
}

#[tokio::test]
async fn test_failed_record_is_isolated_and_others_continue() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_cas(&server).await;
    mount_search(&server, &["aa01", "dead", "bb02"]).await;
    mount_record(&server, "aa01", 200, record_page("A", "Kirkland House", None, "a@x.edu")).await;
    mount_record(&server, "dead", 500, "boom".to_string()).await;
    mount_record(&server, "bb02", 200, record_page("B", "Quincy House", None, "b@x.edu")).await;

    let mut scraper = scraper_for(&server, GOOD_PASSWORD);
    let outcome = scraper.scrape(&SearchFilter::new()).await.unwrap();

    assert_eq!(outcome.total(), 3);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, RecordId::new("dead"));
    assert_eq!(outcome.failed[0].error.kind(), ErrorKind::Fetch);
    let names: Vec<_> = outcome.records.iter().filter_map(|r| r.get("name")).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[tokio::test]
async fn test_search_page_error_aborts_search() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_cas(&server).await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut scraper = scraper_for(&server, GOOD_PASSWORD);
    scraper.login().await.unwrap();
    let err = scraper.search(&SearchFilter::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(scraper.last_read().is_empty());
}

#[tokio::test]
async fn test_record_redirect_without_location_is_isolated() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_cas(&server).await;
    mount_search(&server, &["aa01", "dead", "bb02"]).await;
    mount_record(&server, "aa01", 200, record_page("A", "Kirkland House", None, "a@x.edu")).await;
    mount_record(&server, "dead", 302, String::new()).await;
    mount_record(&server, "bb02", 200, record_page("B", "Quincy House", None, "b@x.edu")).await;

    let mut scraper = scraper_for(&server, GOOD_PASSWORD);
    scraper.login().await.unwrap();
    let outcome = scraper.search(&SearchFilter::new()).await.unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, RecordId::new("dead"));
    assert!(matches!(
        outcome.failed[0].error,
        ScrapeError::Fetch {
            cause: FetchCause::Redirect(_),
            ..
        }
    ));
    assert_eq!(scraper.last_read().len(), 2);
}

#[tokio::test]
async fn test_record_redirect_loop_is_isolated() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_cas(&server).await;
    mount_search(&server, &["aa01", "dead"]).await;
    mount_record(&server, "aa01", 200, record_page("A", "Kirkland House", None, "a@x.edu")).await;
    Mock::given(method("GET"))
        .and(path("/individual"))
        .and(query_param("id", "dead"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/individual?id=dead"),
        )
        .mount(&server)
        .await;

    let options = ClientOptions {
        max_redirects: 3,
        ..ClientOptions::default()
    };
    let mut scraper = support::scraper_with_options(&server, GOOD_PASSWORD, &options);
    scraper.login().await.unwrap();
    let outcome = scraper.search(&SearchFilter::new()).await.unwrap();

    let names: Vec<_> = outcome.records.iter().filter_map(|r| r.get("name")).collect();
    assert_eq!(names, vec!["A"]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].error.kind(), ErrorKind::Fetch);
    assert!(
        outcome.failed[0].error.to_string().contains("exceeded 3 hops"),
        "got: {}",
        outcome.failed[0].error
    );
}
