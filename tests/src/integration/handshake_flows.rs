//! # Handshake Flows
//!
//! Frame establishment end to end: mount, load signal, handshake, ack.
//!
//! ```text
//! create(url) ─▶ mount(launch params) ─▶ loaded ─▶ Handshake ─▶ HandshakeAck
//!                      │                    │
//!               load timeout        handshake timeout
//! ```

#[cfg(test)]
mod tests {
    use crate::support::*;
    use proxy_frame::{
        handshake_wire, ConnectError, FrameId, LaunchParams, ProxyFrameConfig, RouteOutcome,
    };
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // ESTABLISHMENT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_sequential_creates_share_one_frame() {
        let harness = Harness::new();

        let first = harness.connect(API_SOURCE, API_ORIGIN).await;
        let second = harness
            .service
            .create(&url("https://api.example.com/another/page.html"))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(harness.host.mount_count(), 1);
        assert_eq!(harness.service.frame_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_establishment_sends_exactly_one_ack() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let channel = harness.channel(&frame);
        assert_eq!(channel.ack_count(), 1);
        assert!(channel
            .posted()
            .iter()
            .all(|m| m.target_origin.as_str() == API_ORIGIN));
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_params_reach_the_frame() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let source = harness.host.source(frame.frame_id()).unwrap();
        assert_eq!(source.path(), "/proxy.html");

        let params = LaunchParams::from_url(&source).unwrap();
        assert_eq!(params.id, frame.frame_id().to_string());
        assert_eq!(params.scripts_base, "https://app.example.com/scripts/bin");
        assert_eq!(params.parent_origin, "https://app.example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_before_load_event_is_accepted() {
        let harness = Harness::new();
        let remote = harness.remote(1, API_ORIGIN, RemoteScript::HandshakeFirst);

        let frame = harness.service.create(&url(API_SOURCE)).await.unwrap();
        let frame_id = remote.await.unwrap();

        assert_eq!(*frame.frame_id(), frame_id);
        // The late load event finds no loader
        assert!(!harness.service.frame_loaded(&frame_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_origins_get_separate_frames() {
        let harness = Harness::new();

        let api = harness.connect(API_SOURCE, API_ORIGIN).await;
        let cdn = harness.connect(CDN_SOURCE, CDN_ORIGIN).await;

        assert!(!Arc::ptr_eq(&api, &cdn));
        assert_ne!(api.frame_id(), cdn.frame_id());
        assert_eq!(harness.service.frame_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_creates_wait_on_one_loader() {
        let harness = Harness::new();
        let _remote = harness.remote(1, API_ORIGIN, RemoteScript::Cooperative);

        let source = url(API_SOURCE);
        let (a, b, c) = tokio::join!(
            harness.service.create(&source),
            harness.service.create(&source),
            harness.service.create(&source),
        );

        let a = a.unwrap();
        assert!(Arc::ptr_eq(&a, &b.unwrap()));
        assert!(Arc::ptr_eq(&a, &c.unwrap()));
        assert_eq!(harness.host.mount_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_creates_share_failure() {
        let harness = Harness::new();
        let _remote = harness.remote(1, API_ORIGIN, RemoteScript::Silent);

        let source = url(API_SOURCE);
        let (a, b) = tokio::join!(harness.service.create(&source), harness.service.create(&source));

        assert_eq!(a.unwrap_err(), ConnectError::LoadTimedOut);
        assert_eq!(b.unwrap_err(), ConnectError::LoadTimedOut);
        assert_eq!(harness.host.mount_count(), 1);
    }

    // =============================================================================
    // FAILURES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_no_load_signal_times_out() {
        let harness = Harness::new();
        let remote = harness.remote(1, API_ORIGIN, RemoteScript::Silent);

        let started = tokio::time::Instant::now();
        let err = harness.service.create(&url(API_SOURCE)).await.unwrap_err();
        let frame_id = remote.await.unwrap();

        assert_eq!(err.to_string(), "frame load timed out");
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert!(started.elapsed() < Duration::from_millis(3100));
        assert_eq!(harness.service.loader_count(), 0);
        assert!(!harness.host.is_mounted(&frame_id));
        assert_eq!(harness.service.frame_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_without_handshake_is_invalid() {
        let harness = Harness::new();
        let remote = harness.remote(1, API_ORIGIN, RemoteScript::LoadOnly);

        let err = harness.service.create(&url(API_SOURCE)).await.unwrap_err();
        let frame_id = remote.await.unwrap();

        assert_eq!(err.to_string(), "loaded frame is invalid");
        assert_eq!(harness.service.loader_count(), 0);
        assert!(!harness.host.is_mounted(&frame_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spoofed_handshake_waits_for_own_timeout() {
        let harness = Harness::new();
        let remote = harness.remote(1, API_ORIGIN, RemoteScript::SpoofedOrigin);

        let service = harness.service.clone();
        let create = tokio::spawn(async move { service.create(&url(API_SOURCE)).await });

        remote.await.unwrap();
        // Still pending after the spoofed handshake
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(harness.service.loader_count(), 1);

        let err = create.await.unwrap().unwrap_err();
        assert_eq!(err, ConnectError::InvalidFrame);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_from_other_origin_is_dropped() {
        let harness = Harness::new();
        let service = harness.service.clone();
        let create = tokio::spawn(async move { service.create(&url(API_SOURCE)).await });

        let frame_id = harness.host.wait_for_mount(1).await.unwrap();
        harness.service.frame_loaded(&frame_id);

        // Consistent claim, but not from the origin the frame was loaded from
        let raw = handshake_wire(&frame_id.to_string(), CDN_ORIGIN);
        assert_eq!(
            harness.service.handle_message(CDN_ORIGIN, &raw),
            RouteOutcome::HandshakeDropped
        );

        // Unknown frame id from the right origin
        let raw = handshake_wire(&FrameId::new().to_string(), API_ORIGIN);
        assert_eq!(
            harness.service.handle_message(API_ORIGIN, &raw),
            RouteOutcome::HandshakeDropped
        );

        let raw = handshake_wire(&frame_id.to_string(), API_ORIGIN);
        assert_eq!(
            harness.service.handle_message(API_ORIGIN, &raw),
            RouteOutcome::HandshakeAccepted
        );
        assert!(create.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_failure_starts_fresh_loader() {
        let harness = Harness::new();
        let failed = harness.remote(1, API_ORIGIN, RemoteScript::Silent);
        assert!(harness.service.create(&url(API_SOURCE)).await.is_err());
        let failed_id = failed.await.unwrap();

        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;
        assert_ne!(*frame.frame_id(), failed_id);
        assert_eq!(harness.host.mount_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_handshake_after_establishment_is_dropped() {
        let harness = Harness::new();
        let frame = harness.connect(API_SOURCE, API_ORIGIN).await;

        let raw = handshake_wire(&frame.frame_id().to_string(), API_ORIGIN);
        assert_eq!(
            harness.service.handle_message(API_ORIGIN, &raw),
            RouteOutcome::HandshakeDropped
        );
        assert_eq!(harness.channel(&frame).ack_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_follow_config() {
        let config = ProxyFrameConfig {
            load_timeout: Duration::from_millis(500),
            handshake_timeout: Duration::from_millis(8000),
            ..ProxyFrameConfig::for_testing()
        };
        let harness = Harness::with_config(config);
        let _remote = harness.remote(1, API_ORIGIN, RemoteScript::LoadOnly);

        let started = tokio::time::Instant::now();
        let err = harness.service.create(&url(API_SOURCE)).await.unwrap_err();

        assert_eq!(err, ConnectError::InvalidFrame);
        // Load timer (500ms) was cancelled by the load event
        assert!(started.elapsed() >= Duration::from_millis(8000));
    }
}
