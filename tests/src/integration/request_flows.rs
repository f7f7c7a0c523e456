//! # Request Flows
//!
//! `execute` through an established frame: correlation, status handling,
//! body decoding and request lifetime.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use proxy_frame::{
        ExecuteError, GuessedBody, HttpMethod, ProxyFrameConfig, RequestBody, RequestSpec,
        ResponseStatus, RouteOutcome,
    };
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn get(path: &str) -> RequestSpec {
        RequestSpec::get(url(API_ORIGIN).join(path).unwrap())
    }

    // =============================================================================
    // RESOLUTION
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_ok_status_resolves_with_normalized_status() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        for (index, (code, expected)) in [
            (200, ResponseStatus::Success),
            (408, ResponseStatus::Timeout),
            (999, ResponseStatus::Error),
            (304, ResponseStatus::NotModified),
            (0, ResponseStatus::None),
        ]
        .into_iter()
        .enumerate()
        {
            let handle = frame.execute(get("/status"), None);
            let id = harness.request_id(&frame, index);
            assert_eq!(
                harness.respond(API_ORIGIN, &id, "ok", code, "text/plain", "x"),
                RouteOutcome::ResponseDelivered
            );

            let response = handle.await.unwrap();
            assert_eq!(response.status(), expected);
            assert_eq!(response.status_code(), code);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_ok_status_rejects_with_response() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let handle = frame.execute(get("/missing"), None);
        let id = harness.request_id(&frame, 0);
        harness.respond(API_ORIGIN, &id, "error", 404, "application/json", r#"{"err":1}"#);

        let err = handle.await.unwrap_err();
        assert!(err.is_remote());
        let response = err.response().unwrap();
        assert_eq!(response.remote_status(), "error");
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.http_status(), 404);
        assert_eq!(response.decode_as_structured().unwrap(), json!({"err": 1}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_settle_independently() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let first = frame.execute(get("/first"), None);
        let second = frame.execute(get("/second"), None);
        let first_id = harness.request_id(&frame, 0);
        let second_id = harness.request_id(&frame, 1);
        assert_ne!(first_id, second_id);

        // Answered in reverse order
        harness.respond(API_ORIGIN, &second_id, "error", 500, "text/plain", "boom");
        harness.respond(API_ORIGIN, &first_id, "ok", 200, "text/plain", "fine");

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap().raw_body(), "fine");
        assert_eq!(second.unwrap_err().response().unwrap().raw_body(), "boom");

        // Duplicates find nothing
        assert_eq!(
            harness.respond(API_ORIGIN, &first_id, "ok", 200, "text/plain", "again"),
            RouteOutcome::ResponseDropped
        );
        assert_eq!(harness.service.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_message_shape() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let body = RequestBody::from_iter([("qty", json!(3)), ("sku", json!("A-1"))]);
        let _handle = frame.execute(
            RequestSpec::new(HttpMethod::Put, url("https://api.example.com/cart/7"))
                .with_header("Content-Type", "application/json"),
            Some(body),
        );

        let (_, request) = &harness.channel(&frame).requests()[0];
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url, "https://api.example.com/cart/7");
        assert_eq!(request.headers["Content-Type"], "application/json");
        assert_eq!(request.data, Some(json!({"qty": 3, "sku": "A-1"})));
    }

    // =============================================================================
    // BODY DECODING
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_body_keeps_raw_access() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let handle = frame.execute(get("/broken"), None);
        let id = harness.request_id(&frame, 0);
        harness.respond(API_ORIGIN, &id, "ok", 200, "application/json", "{not json");

        let response = handle.await.unwrap();
        assert!(response.is_content_type("application/json"));
        assert_eq!(response.raw_body(), "{not json");
        assert!(response.decode_as_structured().is_err());
        assert!(response.guessed_body().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_decoding() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Item {
            id: u32,
            name: String,
        }

        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let handle = frame.execute(get("/items/1"), None);
        let id = harness.request_id(&frame, 0);
        harness.respond(
            API_ORIGIN,
            &id,
            "ok",
            200,
            "application/json; charset=utf-8",
            r#"{"id":1,"name":"widget"}"#,
        );

        let response = handle.await.unwrap();
        assert_eq!(
            response.decode_as::<Item>().unwrap(),
            Item {
                id: 1,
                name: "widget".into()
            }
        );
        assert_eq!(response.decode_as_map().unwrap()["name"], json!("widget"));
        assert!(matches!(response.guessed_body(), Ok(GuessedBody::Structured(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_text_is_guessed_raw() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let handle = frame.execute(get("/hello"), None);
        let id = harness.request_id(&frame, 0);
        harness.respond(API_ORIGIN, &id, "ok", 200, "text/plain", "42");

        let response = handle.await.unwrap();
        assert_eq!(response.guessed_body().unwrap(), GuessedBody::Raw("42"));
        // Forced decoding still works on valid data
        assert_eq!(response.decode_as_structured().unwrap(), json!(42));
    }

    // =============================================================================
    // REQUEST LIFETIME
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_request_times_out() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let handle = frame.execute(get("/slow"), None);
        let id = harness.request_id(&frame, 0);

        let err = handle.await.unwrap_err();
        assert!(matches!(err, ExecuteError::TimedOut(t) if t == Duration::from_secs(5)));
        assert_eq!(harness.service.pending_count(), 0);
        assert_eq!(harness.service.pending_stats().total_timeouts.load(Ordering::Relaxed), 1);

        assert_eq!(
            harness.respond(API_ORIGIN, &id, "ok", 200, "text/plain", "late"),
            RouteOutcome::ResponseDropped
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_deadline_when_disabled() {
        let config = ProxyFrameConfig {
            request_timeout: None,
            ..ProxyFrameConfig::for_testing()
        };
        let harness = Harness::with_config(config);
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let handle = frame.execute(get("/slow"), None);
        let id = harness.request_id(&frame, 0);

        let service = harness.service.clone();
        let late = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            let raw = proxy_frame::response_wire(&id, "ok", 200, "text/plain", "eventually");
            service.handle_message(API_ORIGIN, &raw)
        });

        assert_eq!(handle.await.unwrap().raw_body(), "eventually");
        assert_eq!(late.await.unwrap(), RouteOutcome::ResponseDelivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_request() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let handle = frame.execute(get("/abandoned"), None);
        let id = harness.request_id(&frame, 0);
        assert_eq!(harness.service.pending_count(), 1);

        drop(handle);
        assert_eq!(harness.service.pending_count(), 0);
        assert_eq!(
            harness.respond(API_ORIGIN, &id, "ok", 200, "text/plain", "late"),
            RouteOutcome::ResponseDropped
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_from_foreign_origin_is_ignored() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let handle = frame.execute(get("/secret"), None);
        let id = harness.request_id(&frame, 0);

        assert_eq!(
            harness.respond(EVIL_ORIGIN, &id, "ok", 200, "text/plain", "forged"),
            RouteOutcome::ResponseDropped
        );
        assert_eq!(
            harness.respond(API_ORIGIN, &id, "ok", 200, "text/plain", "genuine"),
            RouteOutcome::ResponseDelivered
        );
        assert_eq!(handle.await.unwrap().raw_body(), "genuine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_limit_applies_across_frames() {
        let config = ProxyFrameConfig {
            max_pending_requests: 2,
            ..ProxyFrameConfig::for_testing()
        };
        let harness = Harness::with_config(config);
        let api = harness.connect(API_SOURCE, API_ORIGIN).await;
        let cdn = harness.connect(CDN_SOURCE, CDN_ORIGIN).await;

        let _a = api.execute(get("/a"), None);
        let _b = cdn.execute(get("/b"), None);
        let err = api.execute(get("/c"), None).await.unwrap_err();

        assert!(matches!(err, ExecuteError::TooManyPending { limit: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_garbage_traffic_is_ignored() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;
        let handle = frame.execute(get("/a"), None);

        for raw in ["", "null", "[]", "{\"id\":1}", "{\"id\":\"x\",\"type\":\"Nope\",\"data\":{}}"] {
            assert_eq!(
                harness.service.handle_message(API_ORIGIN, raw),
                RouteOutcome::Malformed
            );
        }

        let id = harness.request_id(&frame, 0);
        harness.respond(API_ORIGIN, &id, "ok", 200, "text/plain", "still works");
        assert_eq!(handle.await.unwrap().raw_body(), "still works");

        let stats = harness.service.pending_stats();
        assert_eq!(stats.total_registered.load(Ordering::Relaxed), 1);
        assert_eq!(stats.total_completed.load(Ordering::Relaxed), 1);
    }
}
