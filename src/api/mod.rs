pub mod metrics;
pub mod monitor;

pub use metrics::get_metrics;
pub use monitor::{create_monitor, delete_monitor, get_monitor, list_monitors};

use actix_web::{HttpResponse, Responder};

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "ts": chrono::Utc::now(),
    }))
}
