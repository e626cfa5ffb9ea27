mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use business_abilities_load::checks::{HAS_DATA, NO_ERRORS, STATUS_IS_200};
    use business_abilities_load::query::QUERY;
    use business_abilities_load::run;
    use business_abilities_load::scenario::ERRORS;
    use mock_service::Behavior;
    use std::num::NonZeroU32;
    use std::time::Duration;
    use tracing_test::traced_test;
    use volley::builtin::{HTTP_REQS, HTTP_REQ_FAILED};
    use volley::MetricSummary;

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn healthy_service_passes_every_threshold() {
        let mock = mock_with(Behavior::default()).await;

        let stats = run(&short_run(&mock.url(), &[])).await.unwrap();

        assert!(stats.passed(), "{stats}");
        let iterations = stats.iterations();
        assert!((15..=21).contains(&iterations), "{iterations}");
        assert_eq!(stats.metric(HTTP_REQS).map(MetricSummary::count), Some(mock.requests()));
        assert_eq!(stats.metric(ERRORS).map(MetricSummary::rate), Some(0.));
        assert_eq!(stats.checks.len(), 5);
        assert!(stats.checks.iter().all(|c| c.fails == 0 && c.passes == iterations));
        assert!(matches!(
            stats.metric("http_req_duration{name:BusinessAbilitiesQuery}"),
            Some(MetricSummary::Trend(t)) if t.count == iterations
        ));

        let request = mock.last_request().unwrap();
        assert_eq!(request.authorization.as_deref(), Some("Bearer t0ken"));
        assert_eq!(request.staff_id.as_deref(), Some("17"));
        assert_eq!(request.content_type.as_deref(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["query"], QUERY);
        assert_eq!(body["variables"], serde_json::json!({}));

        assert!(logs_contain("Starting load test..."));
        assert!(logs_contain("Total Expected Requests: 20 requests"));
        assert!(logs_contain("Load test completed."));
        assert!(!logs_contain("Rate limit warning"));
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn server_errors_cross_thresholds() {
        let mock = mock_with(Behavior::default().status(500)).await;

        let stats = run(&short_run(&mock.url(), &[])).await.unwrap();

        assert!(!stats.passed());
        assert_eq!(stats.metric(ERRORS).map(MetricSummary::rate), Some(1.));
        assert_eq!(stats.metric(HTTP_REQ_FAILED).map(MetricSummary::rate), Some(1.));
        assert_eq!(stats.check(STATUS_IS_200).unwrap().passes, 0);
        assert_eq!(stats.check(HAS_DATA).unwrap().fails, 0);

        let crossed: Vec<_> = stats
            .thresholds
            .iter()
            .filter(|t| !t.passed)
            .map(|t| t.threshold.metric.as_str())
            .collect();
        assert_eq!(crossed, vec![HTTP_REQ_FAILED, ERRORS]);
        assert!(logs_contain("Threshold crossed: errors: rate<0.05"));
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn malformed_bodies_fail_body_checks_only() {
        let mock = mock_with(Behavior::default().body("<html>oops</html>")).await;

        let stats = run(&short_run(&mock.url(), &[])).await.unwrap();

        assert!(!stats.passed());
        assert_eq!(stats.check(STATUS_IS_200).unwrap().fails, 0);
        assert_eq!(stats.check(NO_ERRORS).unwrap().passes, 0);
        assert_eq!(stats.metric(HTTP_REQ_FAILED).map(MetricSummary::rate), Some(0.));
        assert_eq!(stats.metric(ERRORS).map(MetricSummary::rate), Some(1.));
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn low_quota_is_reported() {
        let mock = mock_with(Behavior::default().ratelimit_remaining(Some(42))).await;

        let stats = run(&short_run(&mock.url(), &["--duration", "300ms"])).await.unwrap();

        assert!(stats.passed(), "{stats}");
        assert!(logs_contain("Rate limit warning: Only 42 requests remaining in quota"));
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn missing_token_only_warns() {
        let mock = mock_with(Behavior::default()).await;

        let stats = run(&short_run(&mock.url(), &["--auth-token", "", "--duration", "300ms"]))
            .await
            .unwrap();

        assert!(logs_contain("AUTH_TOKEN not set. Requests will likely fail authentication."));
        assert!(stats.iterations() > 0);
        let authorization = mock.last_request().and_then(|r| r.authorization).unwrap();
        assert_eq!(authorization.trim_end(), "Bearer");
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn throttled_service_fails_the_run() {
        let mock = mock_with(Behavior::default().max_rps(NonZeroU32::new(5).unwrap())).await;

        let stats = run(&short_run(&mock.url(), &[])).await.unwrap();

        assert!(!stats.passed());
        let failed = stats.metric(HTTP_REQ_FAILED).map(MetricSummary::rate).unwrap();
        assert!(failed > 0.5, "{failed}");
        assert!(logs_contain("Rate limit warning: Only 0 requests remaining in quota"));
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn unreachable_service_counts_as_failures() {
        let stats = run(&short_run(
            "http://127.0.0.1:9",
            &["--duration", "300ms", "--timeout", "500ms"],
        ))
        .await
        .unwrap();

        assert!(!stats.passed());
        assert_eq!(stats.metric(HTTP_REQ_FAILED).map(MetricSummary::rate), Some(1.));
        assert_eq!(stats.check(STATUS_IS_200).unwrap().passes, 0);
        assert!(logs_contain("Load test completed."));
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn slow_responses_cross_latency_thresholds() {
        let mock = mock_with(Behavior::default().delay(Duration::from_millis(2_100))).await;

        let stats = run(&short_run(
            &mock.url(),
            &["--rate", "5", "--duration", "400ms", "--timeout", "5s", "--graceful-stop", "5s"],
        ))
        .await
        .unwrap();

        let crossed: Vec<_> = stats
            .thresholds
            .iter()
            .filter(|t| !t.passed)
            .map(|t| t.threshold.to_string())
            .collect();
        assert_eq!(crossed, vec!["http_req_duration: p(95)<2000"]);
        assert_eq!(stats.interrupted_iterations, 0);
    }
}
