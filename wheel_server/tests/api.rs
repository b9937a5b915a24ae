use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde::de::DeserializeOwned;
use tower::ServiceExt;
use wheel_core::{FixedClock, FixedEntropy, Role, WIN_INDEX};
use wheel_server::{
    routes::{router, AppState},
    service::{SpinService, SpinSettings},
    store::{MemoryStore, WheelStore},
};
use wheel_shared::{
    ApiError, EligibilityResponse, InvitationGrantView, NotificationView, SpinResponse,
    SpinResult, VerifyResponse, WheelInfo,
};

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
}

// All-zero entropy: a nonce of 12:00:00.000 loses, 12:00:00.002 wins.
fn harness(offset_ms: i64) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap() + Duration::milliseconds(offset_ms),
    ));
    let service = SpinService::new(
        store.clone(),
        Arc::new(FixedEntropy::new(vec![0], 7)),
        clock.clone(),
        SpinSettings::default(),
    );
    let app = router(Arc::new(AppState {
        service,
        api_key: "test-key".into(),
    }));
    Harness { app, store, clock }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn json<T: DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn wheel_info() {
    let h = harness(0);
    let (status, body) = send(&h.app, get("/wheel")).await;
    assert_eq!(status, StatusCode::OK);
    let info: WheelInfo = json(&body);
    assert_eq!(info.segments, 20);
    assert_eq!(info.win_index, WIN_INDEX);
    assert_eq!(info.labels[7], "WIN");
    assert_eq!(info.animation_ms, 5000);
}

#[tokio::test]
async fn spin_then_rate_limited() {
    let h = harness(0);

    let (status, body) = send(&h.app, get("/users/u1/eligibility")).await;
    assert_eq!(status, StatusCode::OK);
    let before: EligibilityResponse = json(&body);
    assert!(before.eligible);
    assert_eq!(before.role, Role::User);

    let (status, body) = send(&h.app, post("/spin", serde_json::json!({"user_id": "u1"}))).await;
    assert_eq!(status, StatusCode::OK);
    let spin: SpinResponse = json(&body);
    assert_eq!(spin.result, SpinResult::Lose);
    assert_eq!(spin.landing_segment, 19);
    assert_eq!(spin.full_spins, 7);
    assert_eq!(spin.server_seed, "00".repeat(16));
    assert_eq!(spin.invites_granted, None);

    let (status, body) = send(&h.app, get("/users/u1/eligibility")).await;
    assert_eq!(status, StatusCode::OK);
    let after: EligibilityResponse = json(&body);
    assert!(!after.eligible);
    assert_eq!(after.wait_seconds, Some(12 * 3600));
    assert_eq!(after.wait_display.as_deref(), Some("12h 0m"));

    let (status, body) = send(&h.app, post("/spin", serde_json::json!({"user_id": "u1"}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    match json::<ApiError>(&body) {
        ApiError::NotEligible { wait_seconds, .. } => assert_eq!(wait_seconds, 12 * 3600),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(h.store.all_spins().await.unwrap().len(), 1);

    h.clock.advance(Duration::hours(12));
    let (status, _) = send(&h.app, post("/spin", serde_json::json!({"user_id": "u1"}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn winning_spin_shows_grant_and_notification() {
    let h = harness(2);

    let (status, _) = send(&h.app, get("/users/u1/invitations")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&h.app, post("/spin", serde_json::json!({"user_id": "u1"}))).await;
    assert_eq!(status, StatusCode::OK);
    let spin: SpinResponse = json(&body);
    assert_eq!(spin.result, SpinResult::Win);
    assert_eq!(spin.landing_segment, WIN_INDEX);
    assert_eq!(spin.invites_granted, Some(1));

    let (status, body) = send(&h.app, get("/users/u1/invitations")).await;
    assert_eq!(status, StatusCode::OK);
    let grant: InvitationGrantView = json(&body);
    assert_eq!(grant.invites_remaining, 1);
    assert_eq!(grant.expiration_days, Some(7));

    let (_, body) = send(&h.app, get("/users/u1/notifications")).await;
    let notes: Vec<NotificationView> = json(&body);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, "wheel_win");

    // the disclosed seeds reproduce the result
    let (status, body) = send(
        &h.app,
        post(
            "/verify",
            serde_json::json!({
                "server_seed": spin.server_seed,
                "client_seed": spin.client_seed,
                "nonce": spin.nonce,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let verified: VerifyResponse = json(&body);
    assert_eq!(verified.hash, spin.hash);
    assert_eq!(verified.result, SpinResult::Win);
    assert_eq!(verified.landing_segment, WIN_INDEX);
}

#[tokio::test]
async fn verify_known_vector() {
    let h = harness(0);
    let (status, body) = send(
        &h.app,
        post(
            "/verify",
            serde_json::json!({"server_seed": "server", "client_seed": "client", "nonce": 1_700_000_000_000u64}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let verified: VerifyResponse = json(&body);
    assert_eq!(verified.combined, "server:client:1700000000000");
    assert_eq!(verified.hash_int, 2_080_276_062);
    assert_eq!(verified.roll, 2);
    assert_eq!(verified.result, SpinResult::Lose);
    assert_eq!(verified.landing_segment, 16);
}

#[tokio::test]
async fn admin_role_requires_api_key() {
    let h = harness(0);
    let body = serde_json::json!({"user_id": "boss", "role": "admin"});

    let (status, _) = send(&h.app, post("/admin/roles", body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut wrong = post("/admin/roles", body.clone());
    wrong
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer nope".parse().unwrap());
    let (status, _) = send(&h.app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut ok = post("/admin/roles", body);
    ok.headers_mut()
        .insert(header::AUTHORIZATION, "Bearer test-key".parse().unwrap());
    let (status, _) = send(&h.app, ok).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(h.store.role_of("boss").await.unwrap(), Role::Admin);

    // admins spin as often as they like
    for _ in 0..2 {
        let (status, _) =
            send(&h.app, post("/spin", serde_json::json!({"user_id": "boss"}))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, body) = send(&h.app, get("/users/boss/eligibility")).await;
    let eligibility: EligibilityResponse = json(&body);
    assert!(eligibility.eligible);
    assert_eq!(eligibility.role, Role::Admin);
}

#[tokio::test]
async fn bad_input_is_rejected() {
    let h = harness(0);
    let (status, body) = send(
        &h.app,
        post("/spin", serde_json::json!({"user_id": "u1", "client_seed": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(matches!(json::<ApiError>(&body), ApiError::Invalid(_)));

    let (status, _) = send(&h.app, post("/spin", serde_json::json!({"user_id": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.store.all_spins().await.unwrap().is_empty());
}
