//! # Request Handlers
//!
//! Axum request handlers for the QR payment API. Issuance and status are
//! called by the authenticated client app; the verification callback is
//! called by the payment gateway and is authenticated by the payload
//! signature alone.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use qr_core::{IntentSummary, QrError, QrPayload, VerificationReceipt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Issue request
#[derive(Debug, Deserialize)]
pub struct IssueQrRequest {
    /// Order to issue a payment QR for
    pub order_id: String,
}

/// Gateway verification callback
#[derive(Debug, Deserialize)]
pub struct GatewayCallbackRequest {
    pub qr_id: String,
    pub nonce: String,
    /// Amount in smallest currency unit, as issued
    pub amount: i64,
    pub signature: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }
}

fn qr_error_to_response(err: QrError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Error mapping for the gateway callback: every verification rejection
/// collapses into one generic message so the response does not reveal
/// which check failed. Retryable settlement failures pass through so the
/// gateway retries.
fn gateway_error_to_response(err: QrError) -> (StatusCode, Json<ErrorResponse>) {
    if err.is_verification_rejection() {
        warn!("Gateway callback rejected: {err}");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("verification failed", 401)),
        );
    }
    qr_error_to_response(err)
}

/// Resolve the authenticated caller.
///
/// Session auth (JWT) terminates at the edge in front of this service,
/// which forwards the resolved user id in `x-user-id`.
fn require_user(headers: &HeaderMap) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Missing x-user-id header", 401)),
            )
        })
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "qr-settle",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Issue a signed payment QR for an order
#[instrument(skip(state, headers, request), fields(order_id = %request.order_id))]
pub async fn issue_qr(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<IssueQrRequest>,
) -> Result<Json<QrPayload>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = require_user(&headers)?;

    if request.order_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("order_id must not be empty", 400)),
        ));
    }

    let payload = state
        .engine
        .issue_qr(&request.order_id, &user_id)
        .await
        .map_err(qr_error_to_response)?;

    info!(
        "Issued QR {} for order {}",
        payload.qr_id, payload.order_id
    );

    Ok(Json(payload))
}

/// Gateway verification callback
#[instrument(skip(state, request), fields(qr_id = %request.qr_id))]
pub async fn gateway_callback(
    State(state): State<AppState>,
    Json(request): Json<GatewayCallbackRequest>,
) -> Result<Json<VerificationReceipt>, (StatusCode, Json<ErrorResponse>)> {
    if request.qr_id.trim().is_empty()
        || request.nonce.trim().is_empty()
        || request.signature.trim().is_empty()
        || request.amount <= 0
    {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "qr_id, nonce, signature and a positive amount are required",
                400,
            )),
        ));
    }

    let receipt = state
        .engine
        .verify_and_process(
            &request.qr_id,
            &request.nonce,
            request.amount,
            &request.signature,
        )
        .await
        .map_err(gateway_error_to_response)?;

    if receipt.already_verified {
        info!("Replayed callback for intent {}", receipt.qr_id);
    } else {
        info!(
            "Settled order {} via intent {}",
            receipt.order_id, receipt.qr_id
        );
    }

    Ok(Json(receipt))
}

/// Status poll for an issued QR
#[instrument(skip(state, headers), fields(qr_id = %qr_id))]
pub async fn qr_status(
    State(state): State<AppState>,
    Path(qr_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<IntentSummary>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = require_user(&headers)?;

    let summary = state
        .engine
        .status(&qr_id, &user_id)
        .map_err(qr_error_to_response)?;

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qr_core::IntentStatus;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
    }

    #[test]
    fn test_qr_error_conversion() {
        let err = QrError::OrderNotFound {
            order_id: "ord_1".to_string(),
        };
        let (status, _json) = qr_error_to_response(err);
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_gateway_errors_are_masked() {
        let rejections = [
            QrError::InvalidSignature { qr_id: "qr_1".into() },
            QrError::NonceMismatch { qr_id: "qr_1".into() },
            QrError::AmountMismatch { qr_id: "qr_1".into() },
            QrError::QrExpired { qr_id: "qr_1".into() },
            QrError::IntentNotFound { qr_id: "qr_1".into() },
            QrError::IntentNotPending {
                qr_id: "qr_1".into(),
                status: IntentStatus::Failed,
            },
        ];
        for err in rejections {
            let (status, Json(body)) = gateway_error_to_response(err);
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body.error, "verification failed");
        }

        // Retryable settlement failures pass through unmasked
        let (status, Json(body)) =
            gateway_error_to_response(QrError::SettlementFailed("down".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.error.contains("Settlement failed"));
    }

    #[test]
    fn test_require_user() {
        let mut headers = HeaderMap::new();
        assert!(require_user(&headers).is_err());

        headers.insert("x-user-id", "user_1".parse().unwrap());
        assert_eq!(require_user(&headers).unwrap(), "user_1");
    }
}
