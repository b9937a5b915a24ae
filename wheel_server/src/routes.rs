use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use wheel_core::{SpinSeeds, SPIN_ANIMATION};
use wheel_shared::{
    format_wait, ApiError, EligibilityResponse, InvitationGrantView, NotificationView,
    SetRoleRequest, SpinRequest, SpinResponse, SpinResult, VerifyRequest, VerifyResponse,
    WheelInfo,
};

use crate::{
    error::AppError,
    service::{Eligibility, SpinService},
};

pub struct AppState {
    pub service: SpinService,
    pub api_key: String,
}

type SharedState = Arc<AppState>;

/// `user_id` is taken from the request as-is, so the router must sit behind a
/// proxy that authenticates the caller.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/wheel", get(route_wheel))
        .route("/users/{user_id}/eligibility", get(route_eligibility))
        .route("/users/{user_id}/invitations", get(route_invitations))
        .route("/users/{user_id}/notifications", get(route_notifications))
        .route("/spin", post(route_spin))
        .route("/verify", post(route_verify))
        .route("/admin/roles", post(route_admin_set_role))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn route_wheel(State(state): State<SharedState>) -> Json<WheelInfo> {
    let wheel = state.service.settings().wheel;
    Json(WheelInfo {
        segments: wheel.segments,
        win_index: wheel.win_index,
        labels: wheel
            .segments()
            .into_iter()
            .map(|s| s.label().to_string())
            .collect(),
        win_odds: wheel.win_odds(),
        animation_ms: SPIN_ANIMATION.as_millis() as u64,
    })
}

async fn route_eligibility(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let eligibility = state.service.check_eligibility(&user_id).await?;
    let response = match eligibility {
        Eligibility::Eligible { role } => EligibilityResponse {
            user_id,
            role,
            eligible: true,
            last_spin_at: None,
            next_eligible_at: None,
            wait_seconds: None,
            wait_display: None,
        },
        Eligibility::Ineligible {
            role,
            last_spin_at,
            next_eligible_at,
            wait,
        } => EligibilityResponse {
            user_id,
            role,
            eligible: false,
            last_spin_at: Some(last_spin_at),
            next_eligible_at: Some(next_eligible_at),
            wait_seconds: Some(wait.num_seconds()),
            wait_display: Some(format_wait(wait)),
        },
    };
    Ok(Json(response))
}

async fn route_spin(
    State(state): State<SharedState>,
    Json(req): Json<SpinRequest>,
) -> Result<Json<SpinResponse>, AppError> {
    let receipt = state
        .service
        .spin(&req.user_id, req.client_seed.as_deref(), req.current_rotation)
        .await?;
    let outcome = receipt.outcome;
    Ok(Json(SpinResponse {
        spin_id: receipt.record.id,
        user_id: receipt.record.user_id,
        result: receipt.record.result,
        server_seed_hash: outcome.seeds.server_seed_hash_hex(),
        server_seed: outcome.seeds.server_seed,
        client_seed: outcome.seeds.client_seed,
        nonce: outcome.seeds.nonce,
        hash: outcome.hash,
        roll: outcome.roll,
        landing_segment: outcome.landing_segment,
        rotation: receipt.rotation,
        full_spins: receipt.full_spins,
        animation_ms: SPIN_ANIMATION.as_millis() as u64,
        spun_at: receipt.record.spun_at,
        invites_granted: receipt.invites_granted,
    }))
}

async fn route_verify(
    State(state): State<SharedState>,
    Json(req): Json<VerifyRequest>,
) -> Json<VerifyResponse> {
    let seeds = SpinSeeds::new(req.server_seed, req.client_seed, req.nonce);
    let combined = seeds.combined();
    let outcome = state.service.verify(seeds);
    Json(VerifyResponse {
        combined,
        hash: outcome.hash,
        hash_int: outcome.hash_int,
        roll: outcome.roll,
        result: SpinResult::from_win(outcome.is_win),
        landing_segment: outcome.landing_segment,
    })
}

async fn route_invitations(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<InvitationGrantView>, AppError> {
    match state.service.invitation_grant(&user_id).await? {
        Some(grant) => Ok(Json(grant.into())),
        None => Err(ApiError::NotFound(format!("no invitation grant for {user_id}")).into()),
    }
}

async fn route_notifications(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    let notes = state.service.notifications(&user_id).await?;
    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

async fn route_admin_set_role(
    State(state): State<SharedState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Json(req): Json<SetRoleRequest>,
) -> Result<StatusCode, AppError> {
    let authorized = bearer.is_some_and(|TypedHeader(Authorization(b))| b.token() == state.api_key);
    if !authorized {
        warn!("rejected admin request with missing or wrong api key");
        return Err(ApiError::Unauthorized.into());
    }
    state.service.set_role(&req.user_id, req.role).await?;
    Ok(StatusCode::NO_CONTENT)
}
