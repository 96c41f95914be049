//! Strategy orchestrator.
//!
//! Runs the configured strategies in order until one produces content that
//! clears its quality floor. Every step is bounded by its own timeout and
//! isolated from panics, so one misbehaving strategy costs only its own turn.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};
use url::Url;

use crate::config::{Config, StepPolicy};
use crate::error::{AcquisitionError, AttemptFailure, AttemptReport, RetrieveError, SetupError};
use crate::extract::ContentExtractor;
use crate::models::{AcquisitionOutcome, Method, RetrievalRequest, RetrievalResult};
use crate::quality::{QualityGate, Rejection};
use crate::strategies::{self, Strategy};

/// Result of running one step.
#[derive(Debug)]
enum Attempt {
    Accepted(RetrievalResult),
    Insufficient(Rejection),
    Failed(AcquisitionError),
}

#[derive(Clone)]
struct Step {
    policy: StepPolicy,
    strategy: Arc<dyn Strategy>,
}

/// Escalating article retriever. Immutable once built and cheap to clone.
#[derive(Clone)]
pub struct Retriever {
    steps: Vec<Step>,
    extractor: ContentExtractor,
}

/// Assembles a [`Retriever`] from explicit strategies.
#[derive(Default)]
pub struct RetrieverBuilder {
    steps: Vec<Step>,
    extractor: ContentExtractor,
}

impl RetrieverBuilder {
    /// Append a step. Results are tagged with the strategy's own method;
    /// `policy` supplies the timeout and quality floor.
    pub fn step(mut self, policy: StepPolicy, strategy: Arc<dyn Strategy>) -> Self {
        if policy.method != strategy.method() {
            warn!(
                "Step policy for {} attached to {} strategy",
                policy.method,
                strategy.method()
            );
        }
        self.steps.push(Step { policy, strategy });
        self
    }

    pub fn extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn build(self) -> Retriever {
        Retriever {
            steps: self.steps,
            extractor: self.extractor,
        }
    }
}

impl Retriever {
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Build the configured escalation.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        if config.steps.is_empty() {
            return Err(SetupError::NoSteps);
        }
        let mut builder = Self::builder();
        for policy in &config.steps {
            let strategy = strategies::build(policy.method, config)?;
            builder = builder.step(policy.clone(), strategy);
        }
        Ok(builder.build())
    }

    /// A copy restricted to `methods`, keeping the configured order.
    pub fn only(&self, methods: &[Method]) -> Self {
        Self {
            steps: self
                .steps
                .iter()
                .filter(|s| methods.contains(&s.strategy.method()))
                .cloned()
                .collect(),
            extractor: self.extractor.clone(),
        }
    }

    /// Methods in escalation order.
    pub fn methods(&self) -> Vec<Method> {
        self.steps.iter().map(|s| s.strategy.method()).collect()
    }

    /// Retrieve the article at `url`.
    pub async fn retrieve(&self, url: &str) -> Result<RetrievalResult, RetrieveError> {
        let request = RetrievalRequest::parse(url)?;
        self.retrieve_request(&request).await
    }

    /// Retrieve a parsed request.
    pub async fn retrieve_request(
        &self,
        request: &RetrievalRequest,
    ) -> Result<RetrievalResult, RetrieveError> {
        let url = request.url();
        let mut attempts = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let method = step.strategy.method();
            match self.run_step(step, url).await {
                Attempt::Accepted(result) => {
                    info!("Accepted {} via {}", url, method);
                    return Ok(result);
                }
                Attempt::Insufficient(rejection) => {
                    info!("{} result for {} rejected: {}, escalating", method, url, rejection);
                    attempts.push(AttemptReport {
                        method,
                        failure: AttemptFailure::Rejected(rejection),
                    });
                }
                Attempt::Failed(err) => {
                    warn!("{} failed for {}: {}, escalating", method, url, err);
                    attempts.push(AttemptReport {
                        method,
                        failure: AttemptFailure::Acquisition(err),
                    });
                }
            }
        }

        Err(RetrieveError::Exhausted {
            url: url.to_string(),
            attempts,
        })
    }

    async fn run_step(&self, step: &Step, url: &Url) -> Attempt {
        let timeout = step.policy.timeout();
        let acquisition = AssertUnwindSafe(step.strategy.acquire(url)).catch_unwind();

        let outcome = match tokio::time::timeout(timeout, acquisition).await {
            Err(_) => return Attempt::Failed(AcquisitionError::Timeout { after: timeout }),
            Ok(Err(panic)) => {
                return Attempt::Failed(AcquisitionError::Internal(panic_message(panic.as_ref())))
            }
            Ok(Ok(Err(err))) => return Attempt::Failed(err),
            Ok(Ok(Ok(outcome))) => outcome,
        };

        if !outcome.succeeded {
            return Attempt::Failed(AcquisitionError::from_status(outcome.status_code));
        }
        if !outcome.has_body() {
            return Attempt::Failed(AcquisitionError::SoftFailure("empty body".to_string()));
        }

        self.evaluate(step, url, outcome)
    }

    fn evaluate(&self, step: &Step, url: &Url, outcome: AcquisitionOutcome) -> Attempt {
        let method = step.strategy.method();
        let extracted =
            match panic::catch_unwind(AssertUnwindSafe(|| self.extractor.extract(&outcome.raw_body, url))) {
                Ok(extracted) => extracted,
                Err(panic) => {
                    return Attempt::Failed(AcquisitionError::Internal(format!(
                        "extraction panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                }
            };

        if let Err(rejection) = QualityGate::evaluate(&step.policy.quality(), &extracted.html) {
            return Attempt::Insufficient(rejection);
        }

        let source_url = match (method, outcome.snapshot_url) {
            (Method::Archive, Some(snapshot)) => snapshot,
            _ => url.to_string(),
        };
        Attempt::Accepted(RetrievalResult::new(
            extracted.title,
            source_url,
            extracted.html,
            method,
        ))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "strategy panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    enum Behavior {
        Body(String),
        Snapshot(String, String),
        Fail(AcquisitionError),
        Panic,
        Hang,
    }

    struct Fake {
        method: Method,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Strategy for Fake {
        fn method(&self) -> Method {
            self.method
        }

        async fn acquire(&self, _url: &Url) -> Result<AcquisitionOutcome, AcquisitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Body(body) => Ok(AcquisitionOutcome::success(body.clone(), 200)),
                Behavior::Snapshot(body, snapshot) => {
                    Ok(AcquisitionOutcome::success(body.clone(), 200).with_snapshot(snapshot.clone()))
                }
                Behavior::Fail(err) => Err(err.clone()),
                Behavior::Panic => panic!("boom"),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        }
    }

    fn article(paragraphs: usize) -> String {
        let body: String = (0..paragraphs)
            .map(|i| {
                format!(
                    "<p>Paragraph {} describes the council vote in detail, quoting members \
                     on both sides and laying out what the budget changes mean for residents.</p>",
                    i
                )
            })
            .collect();
        format!("<html><head><title>Budget vote</title></head><body><article>{}</article></body></html>", body)
    }

    struct Harness {
        builder: RetrieverBuilder,
        calls: Vec<(Method, Arc<AtomicUsize>)>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                builder: Retriever::builder(),
                calls: Vec::new(),
            }
        }

        fn step(mut self, method: Method, behavior: Behavior) -> Self {
            let calls = Arc::new(AtomicUsize::new(0));
            self.calls.push((method, calls.clone()));
            let mut policy = StepPolicy::default_for(method);
            policy.timeout_secs = 1;
            self.builder = self.builder.step(
                policy,
                Arc::new(Fake {
                    method,
                    behavior,
                    calls,
                }),
            );
            self
        }
    }

    const URL: &str = "https://news.example.com/budget";

    #[tokio::test]
    async fn live_acceptance_short_circuits() {
        let harness = Harness::new()
            .step(Method::Live, Behavior::Body(article(5)))
            .step(Method::Mercenary, Behavior::Body(article(5)))
            .step(Method::Archive, Behavior::Body(article(5)));
        let calls = harness.calls.clone();
        let retriever = harness.builder.build();

        let result = retriever.retrieve(URL).await.unwrap();
        assert_eq!(result.method(), Method::Live);
        assert_eq!(result.title(), "Budget vote");
        assert_eq!(result.source_url(), URL);
        assert_eq!(calls[1].1.load(Ordering::SeqCst), 0);
        assert_eq!(calls[2].1.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn escalates_in_order_until_accepted() {
        let harness = Harness::new()
            .step(Method::Live, Behavior::Fail(AcquisitionError::Blocked { status: 403 }))
            .step(Method::Mercenary, Behavior::Body("<p>too short</p>".to_string()))
            .step(Method::Headless, Behavior::Fail(AcquisitionError::Challenge("Just a moment".into())))
            .step(Method::Archive, Behavior::Body(article(2)));
        let calls = harness.calls.clone();
        let retriever = harness.builder.build();

        let result = retriever.retrieve(URL).await.unwrap();
        assert_eq!(result.method(), Method::Archive);
        for (_, count) in &calls {
            assert_eq!(count.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn exhaustion_reports_every_attempt_in_order() {
        let retriever = Harness::new()
            .step(Method::Live, Behavior::Fail(AcquisitionError::Status { status: 404 }))
            .step(Method::Mercenary, Behavior::Body(article(1)))
            .step(Method::Archive, Behavior::Fail(AcquisitionError::NoSnapshot))
            .builder
            .build();

        let err = retriever.retrieve(URL).await.unwrap_err();
        let RetrieveError::Exhausted { url, attempts } = &err else {
            panic!("expected exhaustion, got {:?}", err);
        };
        assert_eq!(url, URL);
        let methods: Vec<Method> = attempts.iter().map(|a| a.method).collect();
        assert_eq!(methods, vec![Method::Live, Method::Mercenary, Method::Archive]);
        assert!(matches!(
            attempts[1].failure,
            AttemptFailure::Rejected(Rejection::TooShort { .. })
        ));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn archive_reports_snapshot_url() {
        let snapshot = "https://web.archive.org/web/20240101000000/https://news.example.com/budget";
        let retriever = Harness::new()
            .step(
                Method::Archive,
                Behavior::Snapshot(article(2), snapshot.to_string()),
            )
            .builder
            .build();

        let result = retriever.retrieve(URL).await.unwrap();
        assert_eq!(result.source_url(), snapshot);
    }

    #[tokio::test]
    async fn snapshot_url_is_ignored_for_other_methods() {
        let retriever = Harness::new()
            .step(
                Method::Mercenary,
                Behavior::Snapshot(article(2), "https://elsewhere.example/".to_string()),
            )
            .builder
            .build();

        let result = retriever.retrieve(URL).await.unwrap();
        assert_eq!(result.source_url(), URL);
    }

    #[tokio::test]
    async fn panicking_strategy_becomes_internal_failure() {
        let harness = Harness::new()
            .step(Method::Live, Behavior::Panic)
            .step(Method::Archive, Behavior::Body(article(2)));
        let retriever = harness.builder.build();

        let result = retriever.retrieve(URL).await.unwrap();
        assert_eq!(result.method(), Method::Archive);

        let only_panic = retriever.only(&[Method::Live]);
        let err = only_panic.retrieve(URL).await.unwrap_err();
        let RetrieveError::Exhausted { attempts, .. } = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(
            attempts[0].failure,
            AttemptFailure::Acquisition(AcquisitionError::Internal("boom".to_string()))
        );
    }

    #[tokio::test]
    async fn hung_strategy_times_out_and_escalates() {
        let harness = Harness::new()
            .step(Method::Headless, Behavior::Hang)
            .step(Method::Archive, Behavior::Body(article(2)));
        let retriever = harness.builder.build();

        let result = retriever.retrieve(URL).await.unwrap();
        assert_eq!(result.method(), Method::Archive);

        let err = retriever.only(&[Method::Headless]).retrieve(URL).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_any_strategy_runs() {
        let harness = Harness::new().step(Method::Live, Behavior::Body(article(5)));
        let calls = harness.calls.clone();
        let retriever = harness.builder.build();

        let err = retriever.retrieve("not a url").await.unwrap_err();
        assert!(matches!(err, RetrieveError::InvalidInput(_)));
        assert_eq!(calls[0].1.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn only_keeps_configured_order() {
        let retriever = Harness::new()
            .step(Method::Live, Behavior::Panic)
            .step(Method::Mercenary, Behavior::Panic)
            .step(Method::Archive, Behavior::Panic)
            .builder
            .build();
        assert_eq!(
            retriever.only(&[Method::Archive, Method::Live]).methods(),
            vec![Method::Live, Method::Archive]
        );
    }

    #[test]
    fn empty_config_is_a_setup_error() {
        let config = Config {
            steps: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(Retriever::from_config(&config), Err(SetupError::NoSteps)));
    }

    #[test]
    fn retriever_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Retriever>();
    }
}
