mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use business_abilities_load::scenario::{business_abilities, ERRORS};
    use business_abilities_load::RequestContext;
    use mock_service::Behavior;
    use std::num::NonZeroU32;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_test::traced_test;
    use volley::http::Client;
    use volley::prelude::*;
    use volley::MetricSummary;

    fn ctx(base_url: String, pause: Option<Duration>) -> Arc<RequestContext> {
        Arc::new(RequestContext {
            base_url,
            auth_token: "t0ken".to_string(),
            staff_id: "17".to_string(),
            pause,
        })
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn ramping_vus_pause_between_iterations() {
        let mock = mock_with(Behavior::default()).await;
        let client = Client::with_timeout(Duration::from_secs(2)).unwrap();

        let stats = business_abilities(ctx(mock.url(), Some(Duration::from_millis(200))), client)
            .executor(
                RampingVus::new(vec![
                    Stage::new(Duration::from_millis(0), 3),
                    Stage::new(Duration::from_millis(1_000), 3),
                ]),
            )
            .threshold(Threshold::parse(ERRORS, "rate<0.05").unwrap())
            .graceful_stop(Duration::from_secs(2))
            .await
            .unwrap();

        assert!(stats.passed(), "{stats}");
        assert_eq!(stats.peak_vus, 3);
        // Three VUs looping every ~200ms for a second.
        let iterations = stats.iterations();
        assert!((9..=21).contains(&iterations), "{iterations}");
        assert_eq!(mock.requests(), iterations);

        match stats.metric("iteration_duration") {
            Some(MetricSummary::Trend(t)) => assert!(t.min >= Duration::from_millis(200)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn busy_vus_drop_arrivals() {
        let mock = mock_with(Behavior::default().delay(Duration::from_millis(500))).await;
        let client = Client::new().unwrap();
        let rate = NonZeroU32::new(20).unwrap();

        let stats = business_abilities(ctx(mock.url(), None), client)
            .executor(ConstantArrivalRate::new(rate, Duration::from_secs(1)).vus(1, 2))
            .graceful_stop(Duration::from_secs(2))
            .await
            .unwrap();

        // Two VUs can each finish two 500ms iterations in a second.
        assert!(stats.iterations() <= 5, "{stats}");
        assert!(stats.dropped_iterations() >= 10, "{stats}");
        assert_eq!(stats.peak_vus, 2);
        assert!(logs_contain("All 2 VUs are busy; iterations are being dropped"));
    }
}
