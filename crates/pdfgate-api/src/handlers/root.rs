use crate::constants::{SERVICE_NAME, SERVICE_VERSION};
use axum::Json;
use serde_json::{json, Value};

/// Service identity and the endpoint map.
pub async fn service_info() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "endpoints": {
            "health": "/health",
            "sync_conversion": "/generate-pdf",
            "async_conversion": "/generate-pdf-async",
            "job_status": "/job-status/{job_id}",
            "job_result": "/job-result/{job_id}",
            "job_delete": "/job/{job_id}"
        }
    }))
}
