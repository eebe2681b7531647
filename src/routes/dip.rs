//! DIP route handlers
//!
//! JSON endpoints over the registry: list, fetch, register, validate,
//! transition and history.

use crate::dip::{parse, DipFilter, DipId, DipStatus, DipSummary, SchemaValidator};
use crate::error::{ApiResult, AppError};
use crate::models::{
    DipListQuery, DipListResponse, DipResponse, HistoryResponse, RegisterResponse,
    StatsResponse, SuccessResponse, TransitionRequest, TransitionResponse, ValidateResponse,
};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

/// List DIPs, optionally filtered by status kind and author
pub async fn list_dips(
    State(state): State<SharedState>,
    Query(query): Query<DipListQuery>,
) -> ApiResult<Json<SuccessResponse<DipListResponse>>> {
    let filter = DipFilter::try_from(query)?;
    let listing = state.registry.list(filter).await;
    let dips: Vec<DipSummary> = listing.iter().map(DipSummary::from).collect();

    Ok(Json(SuccessResponse::with_data(
        "DIPs retrieved",
        DipListResponse {
            count: dips.len(),
            dips,
        },
    )))
}

/// Get a single DIP with all sections and history
pub async fn get_dip(
    State(state): State<SharedState>,
    Path(id): Path<DipId>,
) -> ApiResult<Json<SuccessResponse<DipResponse>>> {
    let dip = state.registry.get(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "DIP retrieved",
        DipResponse { dip: (*dip).clone() },
    )))
}

/// Register a DIP from its raw markdown text
pub async fn register_dip(
    State(state): State<SharedState>,
    body: String,
) -> ApiResult<(StatusCode, Json<SuccessResponse<RegisterResponse>>)> {
    let doc = parse(&body)?;
    let report = SchemaValidator::report(&doc);

    if state.strict && report.has_errors {
        return Err(AppError::Invalid(report.violations));
    }

    let dip = state.registry.register(doc).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("DIP{} registered", dip.id),
            RegisterResponse {
                dip: (*dip).clone(),
                violations: report.violations,
            },
        )),
    ))
}

/// Parse and validate raw markdown without registering it
pub async fn validate_dip(body: String) -> ApiResult<Json<SuccessResponse<ValidateResponse>>> {
    let doc = parse(&body)?;
    let report = SchemaValidator::report(&doc);
    let message = if report.is_clean() {
        "Document is valid".to_string()
    } else {
        format!("Document has {} violation(s)", report.violations.len())
    };

    Ok(Json(SuccessResponse::with_data(
        message,
        ValidateResponse {
            dip: DipSummary::from(&doc),
            report,
        },
    )))
}

/// Move a DIP to another lifecycle state
pub async fn transition_dip(
    State(state): State<SharedState>,
    Path(id): Path<DipId>,
    Json(req): Json<TransitionRequest>,
) -> ApiResult<Json<SuccessResponse<TransitionResponse>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let target = req
        .target
        .parse::<DipStatus>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (dip, transition) = state.registry.apply_transition(id, target, req.note).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("DIP{} is now {}", id, dip.status),
        TransitionResponse {
            dip: (*dip).clone(),
            transition,
        },
    )))
}

/// Transition history of a DIP
pub async fn dip_history(
    State(state): State<SharedState>,
    Path(id): Path<DipId>,
) -> ApiResult<Json<SuccessResponse<HistoryResponse>>> {
    let history = state.registry.history(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "History retrieved",
        HistoryResponse { id, history },
    )))
}

/// Registry statistics by status
pub async fn registry_stats(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<StatsResponse>>> {
    let by_status = state.registry.status_counts().await;
    let total = state.registry.len().await;

    Ok(Json(SuccessResponse::with_data(
        "Registry statistics",
        StatsResponse { total, by_status },
    )))
}
