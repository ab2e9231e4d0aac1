/// Assigns every field of `$body` that is `Some` to the field of the same name in `$target`.
macro_rules! set {
    ($body:ident, $target:ident; $($field:ident),*) => {
        $(if let Some(value) = $body.$field {
            $target.$field = value;
        })*
    };
}

pub(crate) use set;

mod auth;
mod cliente;
pub mod doc;
pub mod error;
pub mod extract;
mod incidencia;
mod info;
pub mod middleware;
mod orden;
mod sucursal;
pub mod user;
mod vacaciones;

use crate::api::doc::ApiDoc;
use crate::api::error::{ApiError, ApiResult};
use crate::app::AppState;
use crate::auth::Client;
use crate::config::{Config, RegexType};
use crate::model::enums::Rol;
use axum::Router;
use axum::routing::get;
use rust_decimal::Decimal;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// Roles of staff members that handle work orders.
const STAFF: &[Rol] = &[Rol::Admin, Rol::Recepcion, Rol::Tecnico];
/// Roles that manage clients and create work orders.
const FRONT_DESK: &[Rol] = &[Rol::Admin, Rol::Recepcion];
const ADMIN: &[Rol] = &[Rol::Admin];
/// Roles that decide on vacation requests and manage employee incidents.
const APPROVERS: &[Rol] = &[Rol::Admin, Rol::JefeTaller];

/// Builds every route of the application that isn't a static file: the versioned API
/// under `/api/v1`, health checks and the interactive documentation under `/docs`.
pub fn routes(state: AppState) -> Router {
    let protected = OpenApiRouter::new()
        .merge(auth::protected_routes())
        .merge(user::routes())
        .merge(cliente::routes())
        .merge(sucursal::routes())
        .merge(orden::routes())
        .merge(vacaciones::routes())
        .merge(incidencia::routes())
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth));
    let (api_router, api) = OpenApiRouter::new()
        .merge(protected)
        .merge(auth::public_routes())
        .split_for_parts();
    let openapi = ApiDoc::openapi().nest("/api/v1", api);

    // Collection endpoints are reachable with or without a trailing slash
    let api_service = NormalizePathLayer::trim_trailing_slash().layer(api_router.with_state(state));
    Router::new()
        .nest_service("/api/v1", api_service)
        .route("/health", get(info::health))
        .route("/api/health", get(info::health))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", openapi))
}

/// Converts the optional `skip` and `limit` query parameters of a list endpoint
/// into an offset and a bounded page size.
pub fn page(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    (skip.unwrap_or(0).max(0), limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT))
}

pub fn verify_role(client: &Client, roles: &'static [Rol]) -> ApiResult<()> {
    if client.has_role(roles) {
        Ok(())
    } else {
        Err(ApiError::MissingRole(roles))
    }
}

pub fn verify_matches_regex(config: &Config, haystack: &str, regex_type: RegexType) -> ApiResult<()> {
    config
        .regex(regex_type)
        .is_match(haystack)
        .then_some(())
        .ok_or_else(|| ApiError::ExpressionFailsRegex(haystack.to_owned(), regex_type))
}

/// Checks that `value` has between `min` and `max` characters, inclusive.
pub fn verify_length(field: &'static str, value: &str, min: usize, max: usize) -> ApiResult<()> {
    let length = value.chars().count();
    if length >= min && length <= max {
        Ok(())
    } else if min == 0 {
        Err(ApiError::TooLong { field, max })
    } else {
        Err(ApiError::InvalidLength { field, min, max })
    }
}

pub fn verify_min_length(field: &'static str, value: &str, min: usize) -> ApiResult<()> {
    if value.trim().chars().count() >= min {
        Ok(())
    } else {
        Err(ApiError::TooShort { field, min })
    }
}

pub fn verify_max_length(field: &'static str, value: Option<&str>, max: usize) -> ApiResult<()> {
    value.map_or(Ok(()), |value| verify_length(field, value, 0, max))
}

/// Largest amount of money a `NUMERIC(10, 2)` column holds.
pub fn max_price() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

/// Largest day count a `NUMERIC(6, 2)` column holds.
pub fn max_days() -> Decimal {
    Decimal::new(9_999_99, 2)
}

/// Checks that `value` is non-negative, has at most two decimals and doesn't exceed `max`.
pub fn verify_amount(field: &'static str, value: Option<Decimal>, max: Decimal) -> ApiResult<()> {
    match value {
        Some(amount) if amount.is_sign_negative() && !amount.is_zero() => Err(ApiError::NegativeAmount(field)),
        Some(amount) if amount > max || amount.normalize().scale() > 2 => Err(ApiError::AmountOutOfRange(field)),
        _ => Ok(()),
    }
}

/// The new text of a field in an update body. Both an absent field and an explicit
/// `null` yield [`None`].
pub fn new_value(value: &Option<Option<String>>) -> Option<&str> {
    value.as_ref().and_then(Option::as_deref)
}

/// Trims an optional text field, treating blank text as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}
