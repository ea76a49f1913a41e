//! Admin offramp review routes.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use durian_common::{DurianError, OfframpRequestId, OfframpStatus};
use durian_ledger::OfframpUpdate;

use crate::{AdminUser, ApiError, AppState};

/// Creates the admin offramp routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/offramp", get(list_offramps))
        .route(
            "/api/admin/offramp/{id}",
            get(get_offramp).patch(update_offramp),
        )
}

/// Query parameters for listing offramp requests.
#[derive(Debug, Deserialize)]
pub struct ListOfframpQuery {
    pub status: Option<String>,
}

fn parse_id(raw: &str) -> Result<OfframpRequestId, ApiError> {
    OfframpRequestId::parse(raw).map_err(|_| {
        ApiError::Domain(DurianError::InvalidRequest {
            message: format!("Invalid offramp request id: {raw}"),
            field: Some("id".to_string()),
        })
    })
}

/// GET `/api/admin/offramp[?status=]` - review table, newest first.
async fn list_offramps(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListOfframpQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OfframpStatus>)
        .transpose()?;

    let listing = state.offramps.list(status).await?;

    Ok(Json(json!({
        "offrampRequests": listing.requests,
        "pendingCount": listing.pending_count,
    })))
}

/// GET `/api/admin/offramp/{id}`.
async fn get_offramp(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let request = state.offramps.get(id).await?;
    Ok(Json(json!({ "offrampRequest": request })))
}

/// PATCH `/api/admin/offramp/{id}` - move a request through review.
async fn update_offramp(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<OfframpUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let Json(update) = payload?;

    match state.offramps.update(id, &update, admin.email()).await {
        Ok(request) => {
            state.metrics.offramp_updated();
            info!(
                offramp_id = %request.id,
                status = %request.status,
                admin = %admin.email(),
                "Offramp request reviewed"
            );
            Ok(Json(json!({ "offrampRequest": request })))
        }
        Err(e) => {
            match &e {
                DurianError::InvalidTransition { .. } => state.metrics.transition_rejected(),
                DurianError::ConcurrentModification(_) => state.metrics.update_conflict(),
                _ => {}
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{test_app, ADMIN};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_admin_routes_require_allowlisted_email() {
        let app = test_app();
        let id = app.create_offramp().await;
        let uri = format!("/api/admin/offramp/{id}");

        let (status, body) = app.get(&uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "FORBIDDEN");

        let (status, _) = app
            .json("PATCH", &uri, Some("guest@durian.cash"), json!({ "status": "processing" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.admin_get(&uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["offrampRequest"]["status"], "pending");

        assert_eq!(app.state.metrics.snapshot().admin_denied, 2);
    }

    #[tokio::test]
    async fn test_review_flow() {
        let app = test_app();
        let id = app.create_offramp().await;
        let uri = format!("/api/admin/offramp/{id}");

        let (status, body) = app
            .json("PATCH", &uri, Some(ADMIN), json!({ "status": "processing" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["offrampRequest"]["status"], "processing");

        let (status, body) = app
            .json(
                "PATCH",
                &uri,
                Some("OPS@durian.cash"),
                json!({
                    "status": "fulfilled",
                    "admin_notes": "paid",
                    "bank_transfer_ref": "KBANK-0042",
                    "amount_thb": 3550.0
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let request = &body["offrampRequest"];
        assert_eq!(request["status"], "fulfilled");
        assert_eq!(request["fulfilled_by"], ADMIN);
        assert_eq!(request["bank_transfer_ref"], "KBANK-0042");
        assert_eq!(request["amount_thb"], json!(3550.0));
        assert!(request["fulfilled_at"].is_string());
    }

    #[tokio::test]
    async fn test_fulfilled_rejects_processing() {
        let app = test_app();
        let id = app.create_offramp().await;
        let uri = format!("/api/admin/offramp/{id}");

        let (status, _) = app
            .json("PATCH", &uri, Some(ADMIN), json!({ "status": "fulfilled" }))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .json("PATCH", &uri, Some(ADMIN), json!({ "status": "processing" }))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "INVALID_TRANSITION");

        let (_, body) = app.admin_get(&uri).await;
        assert_eq!(body["offrampRequest"]["status"], "fulfilled");
        assert_eq!(app.state.metrics.snapshot().transitions_rejected, 1);
    }

    #[tokio::test]
    async fn test_closed_requests_reject_field_edits() {
        let app = test_app();
        let paid = app.create_offramp().await;
        let paid_uri = format!("/api/admin/offramp/{paid}");
        let (status, _) = app
            .json(
                "PATCH",
                &paid_uri,
                Some(ADMIN),
                json!({ "status": "fulfilled", "amount_thb": 3550.0, "bank_transfer_ref": "A" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .json(
                "PATCH",
                &paid_uri,
                Some(ADMIN),
                json!({ "amount_thb": 1.0, "bank_transfer_ref": "B", "admin_notes": "edited" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_REQUEST");

        let (_, body) = app.admin_get(&paid_uri).await;
        assert_eq!(body["offrampRequest"]["amount_thb"], json!(3550.0));
        assert_eq!(body["offrampRequest"]["bank_transfer_ref"], "A");
        assert!(body["offrampRequest"]["admin_notes"].is_null());

        let rejected = app.create_offramp().await;
        let rejected_uri = format!("/api/admin/offramp/{rejected}");
        app.json(
            "PATCH",
            &rejected_uri,
            Some(ADMIN),
            json!({ "status": "rejected", "admin_notes": "account name mismatch" }),
        )
        .await;

        let (status, _) = app
            .json("PATCH", &rejected_uri, Some(ADMIN), json!({ "admin_notes": "rewritten" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = app.admin_get(&rejected_uri).await;
        assert_eq!(body["offrampRequest"]["admin_notes"], "account name mismatch");
    }

    #[tokio::test]
    async fn test_patch_validation() {
        let app = test_app();
        let id = app.create_offramp().await;
        let uri = format!("/api/admin/offramp/{id}");

        let (status, body) = app.json("PATCH", &uri, Some(ADMIN), json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid request: No valid fields to update");

        let (status, _) = app
            .json(
                "PATCH",
                &uri,
                Some(ADMIN),
                json!({ "status": "rejected", "bank_transfer_ref": "X" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json("PATCH", &uri, Some(ADMIN), json!({ "status": "approved" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json(
                "PATCH",
                "/api/admin/offramp/not-a-uuid",
                Some(ADMIN),
                json!({ "status": "processing" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let app = test_app();
        let uri = format!("/api/admin/offramp/{}", durian_common::OfframpRequestId::new());

        let (status, body) = app
            .json("PATCH", &uri, Some(ADMIN), json!({ "status": "processing" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "OFFRAMP_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_with_filter_and_pending_count() {
        let app = test_app();
        let first = app.create_offramp().await;
        app.create_offramp().await;

        app.json(
            "PATCH",
            &format!("/api/admin/offramp/{first}"),
            Some(ADMIN),
            json!({ "status": "rejected", "admin_notes": "account name mismatch" }),
        )
        .await;

        let (status, body) = app.admin_get("/api/admin/offramp").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["offrampRequests"].as_array().unwrap().len(), 2);
        assert_eq!(body["pendingCount"], 1);

        let (_, body) = app.admin_get("/api/admin/offramp?status=rejected").await;
        let rejected = body["offrampRequests"].as_array().unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0]["admin_notes"], "account name mismatch");

        let (status, _) = app.admin_get("/api/admin/offramp?status=archived").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
