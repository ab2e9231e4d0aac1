use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

const SERVICE_NAME: &str = "crm-talleres-backend";

#[derive(Serialize, ToSchema)]
pub struct Health {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Reports that the server is up. Doesn't touch the database.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}
