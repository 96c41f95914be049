//! End-to-end escalation against fake origin, reader and archive servers.

use std::sync::Arc;

use async_trait::async_trait;
use clearread::config::{Config, StepPolicy};
use clearread::strategies::Strategy;
use clearread::{
    AcquisitionError, AcquisitionOutcome, AttemptFailure, Method, RetrieveError, Retriever,
};
use url::Url;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SNAPSHOT_TS: &str = "20240101120000";

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

fn paragraphs(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                "<p>Paragraph {} of the report explains how the harbour authority reached its \
                 decision, what it will cost and when residents should expect the work to finish.</p>",
                i
            )
        })
        .collect()
}

fn config(services: &MockServer, steps: &[Method]) -> Config {
    let mut config = Config {
        steps: steps.iter().copied().map(StepPolicy::default_for).collect(),
        ..Config::default()
    };
    config.reader.endpoint = format!("{}/reader/", services.uri());
    config.archive.endpoint = format!("{}/wayback/available", services.uri());
    config
}

async fn mount_snapshot(services: &MockServer, target: &str, body: String) -> String {
    let snapshot = format!("{}/web/{}/{}", services.uri(), SNAPSHOT_TS, target);
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .and(query_param("url", target))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": target,
            "archived_snapshots": {
                "closest": {
                    "available": true,
                    "url": snapshot,
                    "timestamp": SNAPSHOT_TS,
                    "status": "200"
                }
            }
        })))
        .mount(services)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(format!("^/web/{}id_/", SNAPSHOT_TS)))
        .respond_with(html(body))
        .mount(services)
        .await;
    snapshot
}

async fn mount_no_snapshot(services: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived_snapshots": {}
        })))
        .mount(services)
        .await;
}

/// Stand-in for the browser step: always lands on an unsolvable challenge.
struct ChallengedBrowser;

#[async_trait]
impl Strategy for ChallengedBrowser {
    fn method(&self) -> Method {
        Method::Headless
    }

    async fn acquire(&self, _url: &Url) -> Result<AcquisitionOutcome, AcquisitionError> {
        Err(AcquisitionError::Challenge("Just a moment...".to_string()))
    }
}

#[tokio::test]
async fn live_page_is_cleaned_and_accepted() {
    let origin = MockServer::start().await;
    let services = MockServer::start().await;
    let page = format!(
        r#"<html><head><title>Harbour works approved</title>
        <meta property="og:title" content="Harbour works approved | Coastal Times"></head>
        <body>
          <nav><a href="/">Home</a></nav>
          <div class="paywall-overlay">Subscribe now</div>
          <article>
            <h1>Harbour works approved</h1>
            <img src="/img/harbour.jpg" alt="harbour">
            {}
            <a href="/related">Related coverage</a>
          </article>
          <footer>Copyright Coastal Times</footer>
        </body></html>"#,
        paragraphs(5)
    );
    Mock::given(method("GET"))
        .and(path("/harbour"))
        .respond_with(html(page))
        .expect(1)
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&services)
        .await;

    let target = format!("{}/harbour", origin.uri());
    let retriever =
        Retriever::from_config(&config(&services, &[Method::Live, Method::Mercenary, Method::Archive]))
            .unwrap();

    let result = retriever.retrieve(&target).await.unwrap();
    assert_eq!(result.method(), Method::Live);
    assert_eq!(result.source_url(), target);
    assert_eq!(result.title(), "Harbour works approved | Coastal Times");

    let content = result.content_html();
    assert!(!content.contains("paywall"));
    assert!(!content.contains("Subscribe now"));
    assert!(!content.contains("<nav"));
    assert!(!content.contains("Copyright"));
    assert!(content.contains(&format!(r#"src="{}/img/harbour.jpg""#, origin.uri())));
    assert!(content.contains(&format!(r#"href="{}/related""#, origin.uri())));
    assert!(content.contains(r#"target="_blank""#));
}

#[tokio::test]
async fn clamped_article_is_released() {
    let origin = MockServer::start().await;
    let services = MockServer::start().await;
    let page = format!(
        r#"<html><head><title>Clamped</title></head><body>
          <div class="story-body truncate" style="max-height: 180px; overflow: hidden">{}</div>
          <div class="piano-paywall">Read the full story with a subscription</div>
        </body></html>"#,
        paragraphs(4)
    );
    Mock::given(method("GET"))
        .and(path("/clamped"))
        .respond_with(html(page))
        .mount(&origin)
        .await;

    let retriever = Retriever::from_config(&config(&services, &[Method::Live])).unwrap();
    let result = retriever
        .retrieve(&format!("{}/clamped", origin.uri()))
        .await
        .unwrap();

    assert_eq!(result.method(), Method::Live);
    let content = result.content_html();
    assert_eq!(content.matches("<p>").count(), 4);
    assert!(!content.contains("subscription"));
    assert!(!content.contains("max-height"));
}

#[tokio::test]
async fn loading_shell_escalates_to_reader() {
    let origin = MockServer::start().await;
    let services = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shell"))
        .respond_with(html(
            "<html><head><title>Loading</title></head><body><div id=\"root\"><p>Loading...</p></div></body></html>",
        ))
        .mount(&origin)
        .await;
    let payload = format!(
        "Title: Harbour works approved\n\nURL Source: {}/shell\n\nMarkdown Content:\n{}",
        origin.uri(),
        (0..3)
            .map(|i| format!(
                "Paragraph {} of the report explains how the harbour authority reached its decision.\n\n",
                i
            ))
            .collect::<String>()
    );
    Mock::given(method("GET"))
        .and(path_regex("^/reader/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(payload, "text/plain"))
        .expect(1)
        .mount(&services)
        .await;

    let retriever =
        Retriever::from_config(&config(&services, &[Method::Live, Method::Mercenary, Method::Archive]))
            .unwrap();
    let result = retriever
        .retrieve(&format!("{}/shell", origin.uri()))
        .await
        .unwrap();

    assert_eq!(result.method(), Method::Mercenary);
    assert_eq!(result.title(), "Harbour works approved");
    assert_eq!(result.content_html().matches("<p>").count(), 3);
}

#[tokio::test]
async fn walled_page_falls_back_to_archive_snapshot() {
    let origin = MockServer::start().await;
    let services = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/reader/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("Title: Blocked\n\nAccess denied", "text/plain"))
        .mount(&services)
        .await;

    let target = format!("{}/walled", origin.uri());
    let snapshot = mount_snapshot(
        &services,
        &target,
        format!(
            "<html><head><title>Archived story</title></head><body><article>{}</article></body></html>",
            paragraphs(2)
        ),
    )
    .await;

    let retriever =
        Retriever::from_config(&config(&services, &[Method::Live, Method::Mercenary, Method::Archive]))
            .unwrap();
    let result = retriever.retrieve(&target).await.unwrap();

    assert_eq!(result.method(), Method::Archive);
    assert_eq!(result.source_url(), snapshot);
    assert_eq!(result.title(), "Archived story");
}

#[tokio::test]
async fn missing_page_everywhere_is_one_exhausted_error() {
    let origin = MockServer::start().await;
    let services = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&origin)
        .await;
    mount_no_snapshot(&services).await;

    let cfg = config(&services, &[Method::Live, Method::Archive]);
    let live = clearread::strategies::build(Method::Live, &cfg).unwrap();
    let archive = clearread::strategies::build(Method::Archive, &cfg).unwrap();
    let retriever = Retriever::builder()
        .step(StepPolicy::default_for(Method::Live), live)
        .step(StepPolicy::default_for(Method::Headless), Arc::new(ChallengedBrowser))
        .step(StepPolicy::default_for(Method::Archive), archive)
        .build();

    let target = format!("{}/gone", origin.uri());
    let err = retriever.retrieve(&target).await.unwrap_err();
    assert!(!err.is_timeout());

    let RetrieveError::Exhausted { url, attempts } = &err else {
        panic!("expected exhaustion, got {:?}", err);
    };
    assert_eq!(url, &target);
    assert_eq!(
        attempts.iter().map(|a| a.failure.clone()).collect::<Vec<_>>(),
        vec![
            AttemptFailure::Acquisition(AcquisitionError::Status { status: 404 }),
            AttemptFailure::Acquisition(AcquisitionError::Challenge("Just a moment...".to_string())),
            AttemptFailure::Acquisition(AcquisitionError::NoSnapshot),
        ]
    );

    let message = err.to_string();
    assert!(message.contains("live: HTTP 404"));
    assert!(message.contains("headless: challenge page not cleared"));
    assert!(message.contains("archive: no archived snapshot available"));
}

#[tokio::test]
async fn invalid_input_never_touches_the_network() {
    let services = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&services)
        .await;

    let retriever = Retriever::from_config(&config(&services, &[Method::Mercenary])).unwrap();
    for bad in ["", "   ", "ftp://example.com/story", "story.html"] {
        assert!(matches!(
            retriever.retrieve(bad).await,
            Err(RetrieveError::InvalidInput(_))
        ));
    }
}
