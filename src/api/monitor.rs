use actix_web::{web, HttpResponse, Responder};

use crate::error::MonitorError;
use crate::models::CreateMonitorRequest;
use crate::state::AppState;

pub fn error_response(err: &MonitorError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        MonitorError::BadRequest => HttpResponse::BadRequest().json(body),
        MonitorError::ProcessNotFound(_) | MonitorError::NotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        MonitorError::DuplicateHandle(_) | MonitorError::Provider(_) => {
            log::error!("Monitor request failed: {}", err);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// An empty body is an empty request; a malformed one is rejected with the
/// parser's message.
fn parse_create_body(body: &[u8]) -> Result<CreateMonitorRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateMonitorRequest::default());
    }
    serde_json::from_slice(body)
}

pub async fn create_monitor(data: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let req = match parse_create_body(&body) {
        Ok(req) => req,
        Err(e) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Invalid request body: {}", e)
            }));
        }
    };

    match data.create(req).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(e) => error_response(&e),
    }
}

pub async fn get_monitor(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.get(&path.into_inner()) {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => error_response(&e),
    }
}

pub async fn list_monitors(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.list())
}

pub async fn delete_monitor(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.delete(&path.into_inner()) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "deleted": true })),
        Err(e) => error_response(&e),
    }
}
