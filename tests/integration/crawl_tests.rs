//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawl
//! sessions end-to-end.

use std::time::Duration;
use weft_crawler::config::Config;
use weft_crawler::crawler::{CrawlSession, SessionState, StopReason};
use weft_crawler::storage::SqliteArchive;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a fast test configuration crawling from `seed`
fn create_test_config(seed: String) -> Config {
    let mut config = Config::default();
    config.seeds = vec![seed];
    config.crawler.workers = 4;
    config.crawler.rate_limit_ms = 0;
    config.crawler.timeout_secs = 5;
    config.crawler.max_pages = 0;
    config.retry.max_attempts = 2;
    config.retry.initial_delay_ms = 10;
    config.retry.max_delay_ms = 50;
    config.benchmark.enabled = false;
    config
}

fn html_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, anchors
        ),
        "text/html; charset=utf-8",
    )
}

async fn mount_page(server: &MockServer, page: &str, title: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html_page(title, links))
        .mount(server)
        .await;
}

/// Number of requests the server received for `page`
async fn hits(server: &MockServer, page: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == page)
        .count()
}

async fn total_hits(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

/// An infinite binary tree of pages: `/n/k` links to `/n/2k+1` and `/n/2k+2`
struct BinaryTree {
    delay: Option<Duration>,
}

impl Respond for BinaryTree {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let k: u64 = request
            .url
            .path()
            .trim_start_matches("/n/")
            .parse()
            .unwrap_or(0);
        let left = format!("/n/{}", 2 * k + 1);
        let right = format!("/n/{}", 2 * k + 2);
        let page = html_page(&format!("Node {}", k), &[&left, &right]);
        match self.delay {
            Some(delay) => page.set_delay(delay),
            None => page,
        }
    }
}

async fn mount_tree(server: &MockServer, delay: Option<Duration>) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/n/\d+$"))
        .respond_with(BinaryTree { delay })
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;

    mount_page(&server, "/", "Home", &["/a", "/b"]).await;
    mount_page(&server, "/a", "A", &["/b", "/c", "/#top"]).await;
    mount_page(&server, "/b", "B", &["/"]).await;
    mount_page(&server, "/c", "C", &[]).await;

    let session = CrawlSession::new(create_test_config(format!("{}/", server.uri()))).unwrap();
    let summary = session.run().await.expect("crawl should succeed");

    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(summary.pages_fetched, 4);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.visited, 4);
    assert_eq!(summary.hosts, 1);

    for page in ["/", "/a", "/b", "/c"] {
        assert_eq!(hits(&server, page).await, 1, "{} fetched more than once", page);
    }

    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.queue().is_closed());
    assert_eq!(summary.workers, 4);
    assert_eq!(summary.workers_stopped, 4);
    assert_eq!(summary.queue.total_queued, 4);
    assert_eq!(summary.queue.total_dequeued, 4);
    assert_eq!(summary.queue.size, 0);
    assert_eq!(session.stats().outstanding(), 0);
}

#[tokio::test]
async fn test_max_pages_stops_infinite_crawl() {
    let server = MockServer::start().await;
    mount_tree(&server, None).await;

    let mut config = create_test_config(format!("{}/n/0", server.uri()));
    config.crawler.max_pages = 5;
    config.crawler.workers = 4;

    let session = CrawlSession::new(config).unwrap();
    let summary = session.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::PageBudget);
    assert_eq!(summary.pages_fetched, 5);
    assert_eq!(total_hits(&server).await, 5);
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.queue().is_closed());
    assert_eq!(session.queue().len(), 0);
}

#[tokio::test]
async fn test_failed_fetch_hands_budget_to_waiting_pages() {
    let server = MockServer::start().await;

    let pages = ["/p1", "/p2", "/p3", "/p4", "/p5", "/p6"];
    mount_page(&server, "/", "Home", &pages).await;
    for page in pages {
        mount_page(&server, page, page, &[]).await;
    }
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    // The slow failing seed holds one of the two budget units while the
    // home page's links are discovered
    let mut config = create_test_config(format!("{}/about", server.uri()));
    config.seeds.push(format!("{}/", server.uri()));
    config.crawler.max_pages = 2;
    config.crawler.workers = 4;

    let summary = CrawlSession::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::PageBudget);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.failures_by_kind.get("http-404"), Some(&1));
    assert_eq!(hits(&server, "/about").await, 1);
    // Both seeds plus exactly one of the waiting pages
    assert_eq!(total_hits(&server).await, 3);
    assert_eq!(summary.workers_stopped, 4);
}

#[tokio::test]
async fn test_depth_limit_is_never_exceeded() {
    let server = MockServer::start().await;
    mount_tree(&server, None).await;

    let mut config = create_test_config(format!("{}/n/0", server.uri()));
    config.crawler.max_depth = 1;

    let session = CrawlSession::new(config).unwrap();
    let summary = session.run().await.unwrap();

    // Seed at depth 0 plus its two children at depth 1
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.queue.total_queued, 3);
    for page in ["/n/0", "/n/1", "/n/2"] {
        assert_eq!(hits(&server, page).await, 1);
    }
    assert_eq!(hits(&server, "/n/3").await, 0);
    assert_eq!(total_hits(&server).await, 3);
}

#[tokio::test]
async fn test_shared_link_fetched_once_under_concurrency() {
    let server = MockServer::start().await;

    let pages: Vec<String> = (0..12).map(|i| format!("/p{}", i)).collect();
    let refs: Vec<&str> = pages.iter().map(String::as_str).collect();
    mount_page(&server, "/", "Hub", &refs).await;
    for page in &pages {
        mount_page(&server, page, page, &["/shared", "/"]).await;
    }
    mount_page(&server, "/shared", "Shared", &[]).await;

    let mut config = create_test_config(format!("{}/", server.uri()));
    config.crawler.workers = 8;

    let summary = CrawlSession::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.pages_fetched, 14);
    assert_eq!(hits(&server, "/shared").await, 1);
    assert_eq!(hits(&server, "/").await, 1);
}

#[tokio::test]
async fn test_page_failures_do_not_abort_crawl() {
    let server = MockServer::start().await;

    mount_page(&server, "/", "Home", &["/missing", "/broken", "/ok"]).await;
    mount_page(&server, "/ok", "Fine", &[]).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = CrawlSession::new(create_test_config(format!("{}/", server.uri()))).unwrap();
    let summary = session.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.pages_failed, 2);
    assert_eq!(summary.failures_by_kind.get("http-404"), Some(&1));
    assert_eq!(summary.failures_by_kind.get("http-500"), Some(&1));

    // 4xx is permanent, 5xx is retried up to max-attempts
    assert_eq!(hits(&server, "/missing").await, 1);
    assert_eq!(hits(&server, "/broken").await, 2);
}

#[tokio::test]
async fn test_filtered_links_are_not_fetched() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        "Home",
        &["/report.pdf", "/wp-admin/settings", "/article", "mailto:me@example.com"],
    )
    .await;
    mount_page(&server, "/article", "Article", &[]).await;

    let summary = CrawlSession::new(create_test_config(format!("{}/", server.uri())))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(hits(&server, "/report.pdf").await, 0);
    assert_eq!(hits(&server, "/wp-admin/settings").await, 0);
}

#[tokio::test]
async fn test_shutdown_drains_and_stops() {
    let server = MockServer::start().await;
    mount_tree(&server, Some(Duration::from_millis(100))).await;

    let mut config = create_test_config(format!("{}/n/0", server.uri()));
    config.crawler.workers = 2;

    let session = CrawlSession::new(config).unwrap();
    let shutdown = session.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        shutdown.shutdown();
    });

    let started = std::time::Instant::now();
    let summary = session.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::Shutdown);
    assert!(summary.pages_fetched >= 1);
    assert_eq!(summary.workers_stopped, 2);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.stats().in_flight(), 0);
    // Every fetch that started also finished
    assert_eq!(total_hits(&server).await as u64, summary.pages_fetched);
}

#[tokio::test]
async fn test_fetched_pages_reach_archive_and_disk() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/about"]).await;
    mount_page(&server, "/about", "About", &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("archive.db");
    let content_dir = dir.path().join("content");

    let mut config = create_test_config(format!("{}/", server.uri()));
    config.archive.database_path = Some(db_path.to_string_lossy().into_owned());
    config.content_saver.enabled = true;
    config.content_saver.output_dir = content_dir.to_string_lossy().into_owned();

    let session = CrawlSession::new(config).unwrap();
    let summary = session.run().await.unwrap();
    drop(session);

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.sinks.delivered, 2);
    assert_eq!(summary.sinks.failed, 0);
    assert_eq!(summary.sinks.dropped, 0);

    let archive = SqliteArchive::new(&db_path).unwrap();
    assert_eq!(archive.count_pages().unwrap(), 2);
    let home = archive
        .get_page(&format!("{}/", server.uri()))
        .unwrap()
        .expect("home page archived");
    assert_eq!(home.title, "Home");
    assert_eq!(home.links, vec![format!("{}/about", server.uri())]);

    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();
    let host_dir = content_dir.join(format!("127_0_0_1_{}", port));
    assert!(host_dir.join("index.html").exists());
    assert!(host_dir.join("about.html").exists());
}

#[tokio::test]
async fn test_benchmark_samples_recorded() {
    let server = MockServer::start().await;
    mount_tree(&server, Some(Duration::from_millis(20))).await;

    let mut config = create_test_config(format!("{}/n/0", server.uri()));
    config.crawler.max_pages = 10;
    config.benchmark.enabled = true;
    config.benchmark.interval_ms = 10;

    let summary = CrawlSession::new(config).unwrap().run().await.unwrap();

    assert!(summary.benchmark.len() >= 2);
    let last = summary.benchmark.last().unwrap();
    assert_eq!(last.pages, summary.pages_fetched);
    assert!(summary
        .benchmark
        .windows(2)
        .all(|pair| pair[0].pages <= pair[1].pages));
}
