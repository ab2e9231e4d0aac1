use crate::api::doc::VACACIONES_TAG;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{self, ADMIN, APPROVERS};
use crate::app::AppState;
use crate::auth::Client;
use crate::model::enums::{EstadoSolicitud, ResourceType, TipoSolicitud};
use crate::model::user::User;
use crate::model::vacaciones::{NewSolicitud, Solicitud};
use crate::resource::vacaciones::{SolicitudInfo, VacationSummary};
use crate::schema::{solicitud_vacaciones, usuario};
use crate::time::DateTime;
use crate::workshop::vacation::{self, Balance};
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list, create))
        .routes(routes!(list_own))
        .routes(routes!(own_summary))
        .routes(routes!(get, update, delete))
        .routes(routes!(decide))
        .routes(routes!(reject))
        .routes(routes!(cancel))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct SolicitudListParams {
    /// Only requests of this employee. Ignored unless the client can approve requests.
    empleado_id: Option<i64>,
    estado: Option<EstadoSolicitud>,
    /// Only requests starting on or after this date.
    fecha_desde: Option<Date>,
    /// Only requests ending on or before this date.
    fecha_hasta: Option<Date>,
    skip: Option<i64>,
    limit: Option<i64>,
}

/// Lists vacation requests. Approvers see every request, everyone else only their own.
#[utoipa::path(
    get,
    path = "/vacaciones",
    tag = VACACIONES_TAG,
    params(SolicitudListParams),
    responses((status = 200, body = Vec<SolicitudInfo>)),
)]
async fn list(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<SolicitudListParams>,
) -> ApiResult<Json<Vec<SolicitudInfo>>> {
    let (offset, limit) = api::page(params.skip, params.limit);
    let mut query = solicitud_vacaciones::table.select(Solicitud::as_select()).into_boxed();
    if !client.has_role(APPROVERS) {
        query = query.filter(solicitud_vacaciones::empleado_id.eq(client.id));
    } else if let Some(empleado_id) = params.empleado_id {
        query = query.filter(solicitud_vacaciones::empleado_id.eq(empleado_id));
    }
    if let Some(estado) = params.estado {
        query = query.filter(solicitud_vacaciones::estado.eq(estado));
    }
    if let Some(fecha_desde) = params.fecha_desde {
        query = query.filter(solicitud_vacaciones::fecha_inicio.ge(fecha_desde));
    }
    if let Some(fecha_hasta) = params.fecha_hasta {
        query = query.filter(solicitud_vacaciones::fecha_fin.le(fecha_hasta));
    }

    state.get_connection()?.transaction(|conn| {
        let solicitudes: Vec<Solicitud> = query
            .order_by((solicitud_vacaciones::fecha_solicitud.desc(), solicitud_vacaciones::id.desc()))
            .offset(offset)
            .limit(limit)
            .load(conn)?;
        SolicitudInfo::new_batch(conn, solicitudes)
            .map(Json)
            .map_err(ApiError::from)
    })
}

#[utoipa::path(
    get,
    path = "/vacaciones/mis-solicitudes",
    tag = VACACIONES_TAG,
    responses((status = 200, body = Vec<SolicitudInfo>)),
)]
async fn list_own(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
) -> ApiResult<Json<Vec<SolicitudInfo>>> {
    state.get_connection()?.transaction(|conn| {
        let solicitudes: Vec<Solicitud> = solicitud_vacaciones::table
            .select(Solicitud::as_select())
            .filter(solicitud_vacaciones::empleado_id.eq(client.id))
            .order_by((solicitud_vacaciones::fecha_solicitud.desc(), solicitud_vacaciones::id.desc()))
            .load(conn)?;
        SolicitudInfo::new_batch(conn, solicitudes)
            .map(Json)
            .map_err(ApiError::from)
    })
}

/// Returns the vacation balance of the authenticated user for the current service year.
#[utoipa::path(
    get,
    path = "/vacaciones/mis-vacaciones",
    tag = VACACIONES_TAG,
    responses((status = 200, body = VacationSummary)),
)]
async fn own_summary(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
) -> ApiResult<Json<VacationSummary>> {
    state.get_connection()?.transaction(|conn| {
        let empleado = find_employee(conn, client.id)?;
        let balance = balance_of(conn, &empleado, DateTime::today())?;
        Ok(Json(VacationSummary::new(&empleado, balance)))
    })
}

#[derive(Deserialize, ToSchema)]
struct SolicitudCreateBody {
    fecha_inicio: Date,
    fecha_fin: Date,
    #[serde(default)]
    tipo: TipoSolicitud,
    /// Number of days, half days or hours depending on `tipo`. Must be positive.
    cantidad: Decimal,
    observaciones: Option<String>,
}

#[utoipa::path(
    post,
    path = "/vacaciones",
    tag = VACACIONES_TAG,
    request_body = SolicitudCreateBody,
    responses(
        (status = 201, body = SolicitudInfo),
        (status = 400, description = "Dates or quantity are invalid, or not enough days are available"),
    ),
)]
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Json(body): Json<SolicitudCreateBody>,
) -> ApiResult<(StatusCode, Json<SolicitudInfo>)> {
    let observaciones = api::non_blank(body.observaciones);
    api::verify_max_length("observaciones", observaciones.as_deref(), 500)?;
    let period = Period {
        fecha_inicio: body.fecha_inicio,
        fecha_fin: body.fecha_fin,
        tipo: body.tipo,
        cantidad: body.cantidad,
    };
    let today = DateTime::today();
    period.verify(today)?;

    let info = state.get_connection()?.transaction(|conn| {
        let empleado = find_employee(conn, client.id)?;
        let balance = balance_of(conn, &empleado, today)?;
        period.verify_available(&balance)?;

        let new_solicitud = NewSolicitud {
            empleado_id: empleado.id,
            fecha_inicio: period.fecha_inicio,
            fecha_fin: period.fecha_fin,
            tipo: period.tipo,
            cantidad: period.cantidad,
            estado: EstadoSolicitud::Pendiente,
            observaciones: observaciones.as_deref(),
        };
        let solicitud = new_solicitud
            .insert_into(solicitud_vacaciones::table)
            .returning(Solicitud::as_returning())
            .get_result(conn)?;
        tracing::info!(
            "{} requested vacation from {} to {}",
            empleado.username,
            solicitud.fecha_inicio,
            solicitud.fecha_fin
        );
        SolicitudInfo::new(conn, solicitud).map_err(ApiError::from)
    })?;
    Ok((StatusCode::CREATED, Json(info)))
}

#[utoipa::path(
    get,
    path = "/vacaciones/{id}",
    tag = VACACIONES_TAG,
    params(("id" = i64, Path, description = "Vacation request id")),
    responses(
        (status = 200, body = SolicitudInfo),
        (status = 403, description = "Request belongs to someone else"),
        (status = 404, description = "Request does not exist"),
    ),
)]
async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(solicitud_id): Path<i64>,
) -> ApiResult<Json<SolicitudInfo>> {
    state.get_connection()?.transaction(|conn| {
        let solicitud = find_solicitud(conn, solicitud_id)?;
        if solicitud.empleado_id != client.id && !client.has_role(APPROVERS) {
            return Err(ApiError::Forbidden("ver esta solicitud"));
        }
        SolicitudInfo::new(conn, solicitud).map(Json).map_err(ApiError::from)
    })
}

/// Request body for updating a pending request. Only provided fields are changed.
#[derive(Deserialize, ToSchema)]
struct SolicitudUpdateBody {
    fecha_inicio: Option<Date>,
    fecha_fin: Option<Date>,
    tipo: Option<TipoSolicitud>,
    cantidad: Option<Decimal>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    observaciones: Option<Option<String>>,
}

/// Updates a pending request of the authenticated user.
#[utoipa::path(
    put,
    path = "/vacaciones/{id}",
    tag = VACACIONES_TAG,
    params(("id" = i64, Path, description = "Vacation request id")),
    request_body = SolicitudUpdateBody,
    responses(
        (status = 200, body = SolicitudInfo),
        (status = 400, description = "Request is no longer pending or the new values are invalid"),
        (status = 403, description = "Request belongs to someone else"),
        (status = 404, description = "Request does not exist"),
    ),
)]
async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(solicitud_id): Path<i64>,
    Json(body): Json<SolicitudUpdateBody>,
) -> ApiResult<Json<SolicitudInfo>> {
    let observaciones = body.observaciones.map(api::non_blank);
    if let Some(observaciones) = &observaciones {
        api::verify_max_length("observaciones", observaciones.as_deref(), 500)?;
    }

    state.get_connection()?.transaction(|conn| {
        let mut solicitud = find_solicitud(conn, solicitud_id)?;
        if solicitud.empleado_id != client.id {
            return Err(ApiError::Forbidden("modificar esta solicitud"));
        }
        if solicitud.estado != EstadoSolicitud::Pendiente {
            return Err(ApiError::RequestNotPending);
        }

        let period = Period {
            fecha_inicio: body.fecha_inicio.unwrap_or(solicitud.fecha_inicio),
            fecha_fin: body.fecha_fin.unwrap_or(solicitud.fecha_fin),
            tipo: body.tipo.unwrap_or(solicitud.tipo),
            cantidad: body.cantidad.unwrap_or(solicitud.cantidad),
        };
        let today = DateTime::today();
        period.verify(today)?;
        let empleado = find_employee(conn, solicitud.empleado_id)?;
        period.verify_available(&balance_of(conn, &empleado, today)?)?;

        solicitud.fecha_inicio = period.fecha_inicio;
        solicitud.fecha_fin = period.fecha_fin;
        solicitud.tipo = period.tipo;
        solicitud.cantidad = period.cantidad;
        if let Some(observaciones) = observaciones {
            solicitud.observaciones = observaciones;
        }
        solicitud.updated_at = DateTime::now();

        let solicitud: Solicitud = solicitud.save_changes(conn)?;
        SolicitudInfo::new(conn, solicitud).map(Json).map_err(ApiError::from)
    })
}

/// Deletes a request that doesn't consume vacation days.
#[utoipa::path(
    delete,
    path = "/vacaciones/{id}",
    tag = VACACIONES_TAG,
    params(("id" = i64, Path, description = "Vacation request id")),
    responses(
        (status = 204),
        (status = 400, description = "Request was approved or taken"),
        (status = 403, description = "Request belongs to someone else"),
        (status = 404, description = "Request does not exist"),
    ),
)]
async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(solicitud_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.get_connection()?.transaction(|conn| {
        let solicitud = find_solicitud(conn, solicitud_id)?;
        if solicitud.empleado_id != client.id && !client.has_role(ADMIN) {
            return Err(ApiError::Forbidden("eliminar esta solicitud"));
        }
        if solicitud.estado.consumes_days() {
            return Err(ApiError::RequestNotDeletable);
        }

        diesel::delete(solicitud_vacaciones::table.find(solicitud.id)).execute(conn)?;
        Ok(StatusCode::NO_CONTENT)
    })
}

#[derive(Deserialize, ToSchema)]
struct DecisionBody {
    /// Approves the request when `true`, rejects it otherwise.
    aprobar: bool,
    /// Reason given to the employee when the request is rejected.
    motivo_rechazo: Option<String>,
}

/// Approves or rejects a pending request. Approval checks the employee's
/// balance again, since other requests may have been approved in the meantime.
#[utoipa::path(
    post,
    path = "/vacaciones/{id}/aprobar",
    tag = VACACIONES_TAG,
    params(("id" = i64, Path, description = "Vacation request id")),
    request_body = DecisionBody,
    responses(
        (status = 200, body = SolicitudInfo),
        (status = 400, description = "Request was already processed or not enough days are available"),
        (status = 403, description = "Requires ADMIN or JEFE_TALLER"),
        (status = 404, description = "Request does not exist"),
    ),
)]
async fn decide(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(solicitud_id): Path<i64>,
    Json(body): Json<DecisionBody>,
) -> ApiResult<Json<SolicitudInfo>> {
    api::verify_role(&client, APPROVERS)?;
    let decision = if body.aprobar {
        Decision::Approve
    } else {
        Decision::Reject(api::non_blank(body.motivo_rechazo))
    };
    apply_decision(&state, &client, solicitud_id, decision).map(Json)
}

#[derive(Deserialize, ToSchema)]
struct RejectionBody {
    motivo_rechazo: Option<String>,
}

#[utoipa::path(
    post,
    path = "/vacaciones/{id}/rechazar",
    tag = VACACIONES_TAG,
    params(("id" = i64, Path, description = "Vacation request id")),
    request_body = RejectionBody,
    responses(
        (status = 200, body = SolicitudInfo),
        (status = 400, description = "Request was already processed"),
        (status = 403, description = "Requires ADMIN or JEFE_TALLER"),
        (status = 404, description = "Request does not exist"),
    ),
)]
async fn reject(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(solicitud_id): Path<i64>,
    Json(body): Json<RejectionBody>,
) -> ApiResult<Json<SolicitudInfo>> {
    api::verify_role(&client, APPROVERS)?;
    let decision = Decision::Reject(api::non_blank(body.motivo_rechazo));
    apply_decision(&state, &client, solicitud_id, decision).map(Json)
}

/// Cancels a request of the authenticated user that is pending, or approved
/// but not started yet.
#[utoipa::path(
    post,
    path = "/vacaciones/{id}/cancelar",
    tag = VACACIONES_TAG,
    params(("id" = i64, Path, description = "Vacation request id")),
    responses(
        (status = 200, body = SolicitudInfo),
        (status = 400, description = "Request can no longer be cancelled"),
        (status = 403, description = "Request belongs to someone else"),
        (status = 404, description = "Request does not exist"),
    ),
)]
async fn cancel(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(solicitud_id): Path<i64>,
) -> ApiResult<Json<SolicitudInfo>> {
    state.get_connection()?.transaction(|conn| {
        let mut solicitud = find_solicitud(conn, solicitud_id)?;
        if solicitud.empleado_id != client.id {
            return Err(ApiError::Forbidden("cancelar esta solicitud"));
        }
        if !is_cancellable(&solicitud, DateTime::today()) {
            return Err(ApiError::RequestNotCancellable);
        }

        solicitud.estado = EstadoSolicitud::Cancelada;
        solicitud.updated_at = DateTime::now();
        let solicitud: Solicitud = solicitud.save_changes(conn)?;
        tracing::info!("{} cancelled vacation request {}", client.username, solicitud.id);
        SolicitudInfo::new(conn, solicitud).map(Json).map_err(ApiError::from)
    })
}

/// Dates and amount of a vacation request.
struct Period {
    fecha_inicio: Date,
    fecha_fin: Date,
    tipo: TipoSolicitud,
    cantidad: Decimal,
}

impl Period {
    /// Checks the parts of the request that don't depend on the employee's balance.
    fn verify(&self, today: Date) -> ApiResult<()> {
        if self.cantidad <= Decimal::ZERO {
            return Err(ApiError::NonPositiveQuantity);
        }
        api::verify_amount("cantidad", Some(self.cantidad), api::max_days())?;
        if self.fecha_fin < self.fecha_inicio {
            return Err(ApiError::EndBeforeStart);
        }
        if self.fecha_inicio < today {
            return Err(ApiError::StartDateInPast);
        }

        let days = vacation::inclusive_days(self.fecha_inicio, self.fecha_fin);
        if vacation::day_equivalent(self.tipo, self.cantidad) > Decimal::from(days) {
            return Err(ApiError::QuantityExceedsPeriod(days));
        }
        Ok(())
    }

    fn verify_available(&self, balance: &Balance) -> ApiResult<()> {
        if vacation::day_equivalent(self.tipo, self.cantidad) > balance.available {
            Err(ApiError::InsufficientVacationDays(balance.available))
        } else {
            Ok(())
        }
    }
}

enum Decision {
    Approve,
    /// Rejection with an optional reason.
    Reject(Option<String>),
}

fn apply_decision(state: &AppState, client: &Client, solicitud_id: i64, decision: Decision) -> ApiResult<SolicitudInfo> {
    state.get_connection()?.transaction(|conn| {
        let mut solicitud = find_solicitud(conn, solicitud_id)?;
        if solicitud.estado != EstadoSolicitud::Pendiente {
            return Err(ApiError::RequestAlreadyProcessed);
        }

        let now = DateTime::now();
        match decision {
            Decision::Approve => {
                let empleado = find_employee(conn, solicitud.empleado_id)?;
                let balance = balance_of(conn, &empleado, now.date())?;
                let period = Period {
                    fecha_inicio: solicitud.fecha_inicio,
                    fecha_fin: solicitud.fecha_fin,
                    tipo: solicitud.tipo,
                    cantidad: solicitud.cantidad,
                };
                period.verify_available(&balance)?;
                solicitud.estado = EstadoSolicitud::Aprobada;
            }
            Decision::Reject(motivo_rechazo) => {
                solicitud.estado = EstadoSolicitud::Rechazada;
                solicitud.motivo_rechazo = motivo_rechazo;
            }
        }
        solicitud.aprobada_por_id = Some(client.id);
        solicitud.fecha_aprobacion = Some(now);
        solicitud.updated_at = now;

        let solicitud: Solicitud = solicitud.save_changes(conn)?;
        tracing::info!("{} marked vacation request {} as {}", client.username, solicitud.id, solicitud.estado);
        SolicitudInfo::new(conn, solicitud).map_err(ApiError::from)
    })
}

fn is_cancellable(solicitud: &Solicitud, today: Date) -> bool {
    match solicitud.estado {
        EstadoSolicitud::Pendiente => true,
        EstadoSolicitud::Aprobada => solicitud.fecha_inicio > today,
        EstadoSolicitud::Rechazada | EstadoSolicitud::Tomada | EstadoSolicitud::Cancelada => false,
    }
}

fn find_solicitud(conn: &mut PgConnection, solicitud_id: i64) -> ApiResult<Solicitud> {
    solicitud_vacaciones::table
        .find(solicitud_id)
        .select(Solicitud::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Solicitud))
}

fn find_employee(conn: &mut PgConnection, user_id: i64) -> ApiResult<User> {
    usuario::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Usuario))
}

/// Computes the vacation balance of `empleado` on `today` from their requests.
fn balance_of(conn: &mut PgConnection, empleado: &User, today: Date) -> ApiResult<Balance> {
    let solicitudes: Vec<Solicitud> = solicitud_vacaciones::table
        .select(Solicitud::as_select())
        .filter(solicitud_vacaciones::empleado_id.eq(empleado.id))
        .load(conn)?;
    let requests: Vec<_> = solicitudes.iter().map(Solicitud::summary).collect();
    vacation::balance(empleado.fecha_ingreso, empleado.dias_vacaciones_pendientes, &requests, today)
        .ok_or(ApiError::AmountOutOfRange("dias_vacaciones_pendientes"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::enums::Rol;
    use crate::test::*;
    use axum::http::header::AUTHORIZATION;
    use serde_json::{Value, json};
    use serial_test::{parallel, serial};
    use time::macros::date;

    fn period(fecha_inicio: Date, fecha_fin: Date, tipo: TipoSolicitud, cantidad: i64) -> Period {
        Period {
            fecha_inicio,
            fecha_fin,
            tipo,
            cantidad: Decimal::from(cantidad),
        }
    }

    #[test]
    fn period_validation() {
        let today = date!(2025 - 03 - 10);
        let start = date!(2025 - 03 - 17);
        let end = date!(2025 - 03 - 21);

        assert!(period(start, end, TipoSolicitud::DiasCompletos, 5).verify(today).is_ok());
        assert!(period(today, today, TipoSolicitud::Horas, 4).verify(today).is_ok());
        assert!(matches!(
            period(start, end, TipoSolicitud::DiasCompletos, 0).verify(today),
            Err(ApiError::NonPositiveQuantity)
        ));
        assert!(matches!(
            period(end, start, TipoSolicitud::DiasCompletos, 1).verify(today),
            Err(ApiError::EndBeforeStart)
        ));
        assert!(matches!(
            period(date!(2025 - 03 - 07), end, TipoSolicitud::DiasCompletos, 1).verify(today),
            Err(ApiError::StartDateInPast)
        ));
        assert!(matches!(
            period(start, end, TipoSolicitud::DiasCompletos, 6).verify(today),
            Err(ApiError::QuantityExceedsPeriod(5))
        ));
        assert!(period(start, end, TipoSolicitud::MedioDia, 10).verify(today).is_ok());
    }

    #[test]
    fn available_days() {
        let today = date!(2025 - 03 - 10);
        let empleado = sample_user(crate::model::enums::Rol::Tecnico);
        let balance = vacation::balance(empleado.fecha_ingreso, Decimal::ZERO, &[], today).unwrap();
        assert_eq!(balance.available, Decimal::from(20));

        let start = date!(2025 - 04 - 01);
        assert!(period(start, date!(2025 - 04 - 30), TipoSolicitud::DiasCompletos, 20).verify_available(&balance).is_ok());
        assert!(matches!(
            period(start, date!(2025 - 04 - 30), TipoSolicitud::DiasCompletos, 21).verify_available(&balance),
            Err(ApiError::InsufficientVacationDays(available)) if available == Decimal::from(20)
        ));
        assert!(period(start, start, TipoSolicitud::Horas, 8).verify_available(&balance).is_ok());
    }

    #[test]
    fn cancellation() {
        let today = date!(2025 - 03 - 10);
        let now = DateTime::from_date(today);
        let mut solicitud = Solicitud {
            id: 1,
            empleado_id: 2,
            fecha_solicitud: now,
            fecha_inicio: date!(2025 - 03 - 11),
            fecha_fin: date!(2025 - 03 - 12),
            tipo: TipoSolicitud::DiasCompletos,
            cantidad: Decimal::from(2),
            estado: EstadoSolicitud::Pendiente,
            aprobada_por_id: None,
            fecha_aprobacion: None,
            observaciones: None,
            motivo_rechazo: None,
            created_at: now,
            updated_at: now,
        };
        assert!(is_cancellable(&solicitud, today));

        solicitud.estado = EstadoSolicitud::Aprobada;
        assert!(is_cancellable(&solicitud, today));
        solicitud.fecha_inicio = today;
        assert!(!is_cancellable(&solicitud, today));

        for estado in [EstadoSolicitud::Rechazada, EstadoSolicitud::Tomada, EstadoSolicitud::Cancelada] {
            solicitud.estado = estado;
            assert!(!is_cancellable(&solicitud, date!(2025 - 01 - 01)));
        }
    }

    #[tokio::test]
    #[parallel]
    async fn requires_authentication() {
        let server = test_server();
        let response = server.get("/api/v1/vacaciones/mis-vacaciones").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .post("/api/v1/vacaciones")
            .json(&json!({"fecha_inicio": "2030-01-01", "fecha_fin": "2030-01-02", "cantidad": 2}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn balance_limits_requests_and_approvals() {
        let Some(state) = database_state() else { return };
        let (jefe, empleado) = seed(&state, |conn| {
            let jefe = create_test_user(conn, "jefe", Rol::JefeTaller)?;
            let empleado = create_test_user(conn, "empleado", Rol::Tecnico)?;
            let empleado: User = diesel::update(usuario::table.find(empleado.id))
                .set(usuario::dias_vacaciones_pendientes.eq(Decimal::from(3)))
                .returning(User::as_returning())
                .get_result(conn)?;
            Ok((jefe, empleado))
        });

        let server = server_for(state);
        let today = DateTime::today();
        let request = |days: i64| {
            let fecha_fin = today + time::Duration::days(days - 1);
            server
                .post("/api/v1/vacaciones")
                .add_header(AUTHORIZATION, token_for(&empleado))
                .json(&json!({"fecha_inicio": today, "fecha_fin": fecha_fin, "cantidad": days}))
        };

        let response = request(4).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["name"], "InsufficientVacationDays");

        // Pending requests don't consume days, so both fit on their own
        let first = request(2).await;
        assert_eq!(first.status_code(), StatusCode::CREATED);
        let second = request(2).await;
        assert_eq!(second.status_code(), StatusCode::CREATED);

        let approve = |solicitud: &Value| {
            server
                .post(&format!("/api/v1/vacaciones/{}/aprobar", solicitud["id"]))
                .add_header(AUTHORIZATION, token_for(&jefe))
                .json(&json!({"aprobar": true}))
        };
        let response = approve(&first.json::<Value>()).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["estado"], "APROBADA");

        let response = approve(&second.json::<Value>()).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["name"], "InsufficientVacationDays");

        let summary = server
            .get("/api/v1/vacaciones/mis-vacaciones")
            .add_header(AUTHORIZATION, token_for(&empleado))
            .await
            .json::<Value>();
        let available: Decimal = summary["dias_vacaciones_disponibles"].as_str().unwrap().parse().unwrap();
        assert_eq!(available, Decimal::ONE);
    }
}
