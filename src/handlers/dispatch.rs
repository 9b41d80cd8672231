/// Admin dispatch trigger and connection status endpoints
///
/// The dispatch endpoint is the external surface the rest of the order
/// platform calls into: everything upstream of it (auth, billing, CRUD) is
/// out of scope here.
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;

use crate::dispatcher::Dispatcher;
use crate::models::{DispatchOutcome, DispatchRequest};
use crate::registry::ConnectionRegistry;

/// Dispatch a notification to one user or to everyone connected
///
/// Endpoint: POST /api/v1/notifications/dispatch
pub async fn dispatch_notification(
    dispatcher: web::Data<Dispatcher>,
    body: web::Json<DispatchRequest>,
) -> ActixResult<HttpResponse> {
    let request = body.into_inner();

    if request.message.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "message must not be empty"
        })));
    }

    match dispatcher
        .dispatch(request.user_id.as_deref(), &request.message)
        .await
    {
        Ok(DispatchOutcome::Delivered) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "delivered": true
        }))),
        Ok(DispatchOutcome::Broadcast { connections }) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "delivered": true,
            "broadcastCount": connections
        }))),
        Ok(DispatchOutcome::NotConnected) => Ok(HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "target user not connected"
        }))),
        Err(e) => {
            tracing::error!(error = %e, "dispatch failed");
            Ok(HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": "internal error"
            })))
        }
    }
}

/// Connection status for one user
///
/// Endpoint: GET /api/v1/notifications/status/{user_id}
pub async fn user_status(
    path: web::Path<String>,
    registry: web::Data<ConnectionRegistry>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let connected = registry.is_connected(&user_id).await;

    Ok(HttpResponse::Ok().json(json!({
        "userId": user_id,
        "connected": connected
    })))
}

/// Registry counters
///
/// Endpoint: GET /api/v1/notifications/stats
pub async fn connection_stats(
    registry: web::Data<ConnectionRegistry>,
) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "openConnections": registry.open_connections().await,
        "registeredUsers": registry.registered_users().await
    })))
}

/// Register notification routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("/dispatch", web::post().to(dispatch_notification))
            .route("/status/{user_id}", web::get().to(user_status))
            .route("/stats", web::get().to(connection_stats)),
    );
}
