use serde_json::json;

use crate::routes::ApiResponse;

pub fn handle_root() -> ApiResponse {
    ApiResponse::ok(json!({ "message": "Optic API is running" }))
}

pub fn handle_health() -> ApiResponse {
    ApiResponse::ok(json!({ "status": "ok" }))
}
