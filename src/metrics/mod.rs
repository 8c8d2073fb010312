//! Prometheus metrics for a judging run.
//!
//! Each run owns a [`JudgeMetrics`] with its own [`Registry`]; nothing is
//! registered globally. The CLI writes the text exposition to
//! `--metrics_file` at the end of a run and logs a short summary.
//!
//! # Example
//!
//! ```
//! use longchain_judge::metrics::JudgeMetrics;
//! use std::time::Duration;
//!
//! let metrics = JudgeMetrics::new().unwrap();
//! metrics.record_request("success", Duration::from_millis(850));
//! metrics.record_score(0.5);
//! assert!(metrics.export().unwrap().contains("judge_requests_total"));
//! ```

use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

use crate::llm::Usage;

/// Metrics collected while judging a batch.
#[derive(Clone)]
pub struct JudgeMetrics {
    registry: Registry,
    requests_total: CounterVec,
    retries_total: Counter,
    parse_failures_total: Counter,
    request_latency: Histogram,
    score: Histogram,
    tokens_total: CounterVec,
    records_total: IntCounterVec,
}

/// Point-in-time counter values, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub requests_success: u64,
    pub requests_transient: u64,
    pub requests_fatal: u64,
    pub retries: u64,
    pub parse_failures: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub records_judged: u64,
    pub records_failed: u64,
}

impl JudgeMetrics {
    /// Creates all metrics and registers them with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("judge_requests_total", "Judge API calls by outcome"),
            &["outcome"],
        )?;

        let retries_total = Counter::new("judge_retries_total", "Judge calls repeated after a transient failure")?;

        let parse_failures_total = Counter::new(
            "judge_parse_failures_total",
            "Judge replies with no extractable verdict",
        )?;

        let request_latency = Histogram::with_opts(
            HistogramOpts::new(
                "judge_request_latency_seconds",
                "Judge API call latency in seconds",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        let score = Histogram::with_opts(
            HistogramOpts::new("judge_score", "Distribution of judge scores")
                .buckets(vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )?;

        let tokens_total = CounterVec::new(
            Opts::new("judge_tokens_total", "Tokens used by the judge"),
            &["type"],
        )?;

        let records_total = IntCounterVec::new(
            Opts::new("judge_records_total", "Records settled by status"),
            &["status"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(retries_total.clone()))?;
        registry.register(Box::new(parse_failures_total.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;
        registry.register(Box::new(score.clone()))?;
        registry.register(Box::new(tokens_total.clone()))?;
        registry.register(Box::new(records_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            retries_total,
            parse_failures_total,
            request_latency,
            score,
            tokens_total,
            records_total,
        })
    }

    /// Records one API call. `outcome` is "success", "transient_error" or "fatal_error".
    pub fn record_request(&self, outcome: &str, latency: Duration) {
        self.requests_total.with_label_values(&[outcome]).inc();
        self.request_latency.observe(latency.as_secs_f64());

        tracing::trace!(
            outcome = outcome,
            latency_ms = latency.as_millis() as u64,
            "Recorded judge request metric"
        );
    }

    pub fn record_retry(&self) {
        self.retries_total.inc();
    }

    pub fn record_parse_failure(&self) {
        self.parse_failures_total.inc();
    }

    pub fn record_score(&self, score: f64) {
        self.score.observe(score);
    }

    pub fn record_tokens(&self, usage: &Usage) {
        self.tokens_total
            .with_label_values(&["input"])
            .inc_by(f64::from(usage.prompt_tokens));
        self.tokens_total
            .with_label_values(&["output"])
            .inc_by(f64::from(usage.completion_tokens));
    }

    /// Records a settled record. `status` is "judged" or "failed".
    pub fn record_outcome(&self, status: &str) {
        self.records_total.with_label_values(&[status]).inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = |outcome: &str| self.requests_total.with_label_values(&[outcome]).get() as u64;
        let tokens = |kind: &str| self.tokens_total.with_label_values(&[kind]).get() as u64;

        MetricsSnapshot {
            requests_success: requests("success"),
            requests_transient: requests("transient_error"),
            requests_fatal: requests("fatal_error"),
            retries: self.retries_total.get() as u64,
            parse_failures: self.parse_failures_total.get() as u64,
            prompt_tokens: tokens("input"),
            completion_tokens: tokens("output"),
            records_judged: self.records_total.with_label_values(&["judged"]).get(),
            records_failed: self.records_total.with_label_values(&["failed"]).get(),
        }
    }

    /// All metrics in the Prometheus text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for JudgeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeMetrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
