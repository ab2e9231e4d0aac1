use crate::api::doc::INCIDENCIA_TAG;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{self, ADMIN, APPROVERS};
use crate::app::AppState;
use crate::auth::Client;
use crate::model::enums::{ResourceType, Severidad, TipoIncidencia};
use crate::model::incidencia::{Incidencia, NewIncidencia};
use crate::model::user::User;
use crate::resource::incidencia::{IncidenciaInfo, IncidenciaStats};
use crate::schema::{incidencia_empleado, usuario};
use crate::time::DateTime;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use serde::Deserialize;
use time::Date;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list, create))
        .routes(routes!(list_own))
        .routes(routes!(get, update, delete))
        .routes(routes!(employee_stats))
}

const MIN_TITULO_LENGTH: usize = 3;
const MAX_TITULO_LENGTH: usize = 200;
const MIN_DESCRIPCION_LENGTH: usize = 10;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct IncidenciaListParams {
    /// Only incidents of this employee. Ignored unless the client can manage incidents.
    empleado_id: Option<i64>,
    tipo: Option<TipoIncidencia>,
    severidad: Option<Severidad>,
    /// Only incidents on or after this date.
    fecha_desde: Option<Date>,
    /// Only incidents on or before this date.
    fecha_hasta: Option<Date>,
    requiere_seguimiento: Option<bool>,
    skip: Option<i64>,
    limit: Option<i64>,
}

/// Lists employee incidents. Approvers see every incident, everyone else only their own.
#[utoipa::path(
    get,
    path = "/incidencias",
    tag = INCIDENCIA_TAG,
    params(IncidenciaListParams),
    responses((status = 200, body = Vec<IncidenciaInfo>)),
)]
async fn list(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<IncidenciaListParams>,
) -> ApiResult<Json<Vec<IncidenciaInfo>>> {
    let (offset, limit) = api::page(params.skip, params.limit);
    let mut query = incidencia_empleado::table.select(Incidencia::as_select()).into_boxed();
    if !client.has_role(APPROVERS) {
        query = query.filter(incidencia_empleado::empleado_id.eq(client.id));
    } else if let Some(empleado_id) = params.empleado_id {
        query = query.filter(incidencia_empleado::empleado_id.eq(empleado_id));
    }
    if let Some(tipo) = params.tipo {
        query = query.filter(incidencia_empleado::tipo.eq(tipo));
    }
    if let Some(severidad) = params.severidad {
        query = query.filter(incidencia_empleado::severidad.eq(severidad));
    }
    if let Some(fecha_desde) = params.fecha_desde {
        query = query.filter(incidencia_empleado::fecha_incidencia.ge(fecha_desde));
    }
    if let Some(fecha_hasta) = params.fecha_hasta {
        query = query.filter(incidencia_empleado::fecha_incidencia.le(fecha_hasta));
    }
    if let Some(requiere_seguimiento) = params.requiere_seguimiento {
        query = query.filter(incidencia_empleado::requiere_seguimiento.eq(requiere_seguimiento));
    }

    state.get_connection()?.transaction(|conn| {
        let incidencias: Vec<Incidencia> = query
            .order_by((incidencia_empleado::fecha_incidencia.desc(), incidencia_empleado::id.desc()))
            .offset(offset)
            .limit(limit)
            .load(conn)?;
        IncidenciaInfo::new_batch(conn, incidencias)
            .map(Json)
            .map_err(ApiError::from)
    })
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct PageParams {
    skip: Option<i64>,
    limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/incidencias/mis-incidencias",
    tag = INCIDENCIA_TAG,
    params(PageParams),
    responses((status = 200, body = Vec<IncidenciaInfo>)),
)]
async fn list_own(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Vec<IncidenciaInfo>>> {
    let (offset, limit) = api::page(params.skip, params.limit);
    state.get_connection()?.transaction(|conn| {
        let incidencias: Vec<Incidencia> = incidencia_empleado::table
            .select(Incidencia::as_select())
            .filter(incidencia_empleado::empleado_id.eq(client.id))
            .order_by((incidencia_empleado::fecha_incidencia.desc(), incidencia_empleado::id.desc()))
            .offset(offset)
            .limit(limit)
            .load(conn)?;
        IncidenciaInfo::new_batch(conn, incidencias)
            .map(Json)
            .map_err(ApiError::from)
    })
}

#[derive(Deserialize, ToSchema)]
struct IncidenciaCreateBody {
    empleado_id: i64,
    fecha_incidencia: Date,
    tipo: TipoIncidencia,
    #[serde(default)]
    severidad: Severidad,
    /// Between 3 and 200 characters.
    titulo: String,
    /// At least 10 characters.
    descripcion: String,
    consecuencias: Option<String>,
    #[serde(default)]
    requiere_seguimiento: bool,
    fecha_seguimiento: Option<Date>,
}

#[utoipa::path(
    post,
    path = "/incidencias",
    tag = INCIDENCIA_TAG,
    request_body = IncidenciaCreateBody,
    responses(
        (status = 201, body = IncidenciaInfo),
        (status = 400, description = "Title or description is too short or too long"),
        (status = 403, description = "Requires ADMIN or JEFE_TALLER"),
        (status = 404, description = "Employee does not exist"),
    ),
)]
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Json(body): Json<IncidenciaCreateBody>,
) -> ApiResult<(StatusCode, Json<IncidenciaInfo>)> {
    api::verify_role(&client, APPROVERS)?;
    let titulo = body.titulo.trim();
    let descripcion = body.descripcion.trim();
    verify_texts(Some(titulo), Some(descripcion))?;
    let consecuencias = api::non_blank(body.consecuencias);

    let info = state.get_connection()?.transaction(|conn| {
        let empleado = find_employee(conn, body.empleado_id)?;
        let new_incidencia = NewIncidencia {
            empleado_id: empleado.id,
            fecha_incidencia: body.fecha_incidencia,
            tipo: body.tipo,
            severidad: body.severidad,
            titulo,
            descripcion,
            consecuencias: consecuencias.as_deref(),
            registrado_por_id: Some(client.id),
            requiere_seguimiento: body.requiere_seguimiento,
            fecha_seguimiento: body.fecha_seguimiento,
        };
        let incidencia = new_incidencia
            .insert_into(incidencia_empleado::table)
            .returning(Incidencia::as_returning())
            .get_result(conn)?;
        tracing::info!("{} recorded incident {} for {}", client.username, incidencia.tipo, empleado.username);
        IncidenciaInfo::new(conn, incidencia).map_err(ApiError::from)
    })?;
    Ok((StatusCode::CREATED, Json(info)))
}

#[utoipa::path(
    get,
    path = "/incidencias/{id}",
    tag = INCIDENCIA_TAG,
    params(("id" = i64, Path, description = "Incident id")),
    responses(
        (status = 200, body = IncidenciaInfo),
        (status = 403, description = "Incident belongs to someone else"),
        (status = 404, description = "Incident does not exist"),
    ),
)]
async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(incidencia_id): Path<i64>,
) -> ApiResult<Json<IncidenciaInfo>> {
    state.get_connection()?.transaction(|conn| {
        let incidencia = find_incidencia(conn, incidencia_id)?;
        if incidencia.empleado_id != client.id && !client.has_role(APPROVERS) {
            return Err(ApiError::Forbidden("ver esta incidencia"));
        }
        IncidenciaInfo::new(conn, incidencia).map(Json).map_err(ApiError::from)
    })
}

/// Request body for updating an incident. Only provided fields are changed.
#[derive(Deserialize, ToSchema)]
struct IncidenciaUpdateBody {
    fecha_incidencia: Option<Date>,
    tipo: Option<TipoIncidencia>,
    severidad: Option<Severidad>,
    titulo: Option<String>,
    descripcion: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    consecuencias: Option<Option<String>>,
    requiere_seguimiento: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    fecha_seguimiento: Option<Option<Date>>,
    seguimiento_completado: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    notas_seguimiento: Option<Option<String>>,
}

impl IncidenciaUpdateBody {
    fn apply(self, incidencia: &mut Incidencia) {
        let body = self;
        api::set!(
            body, incidencia;
            fecha_incidencia,
            tipo,
            severidad,
            requiere_seguimiento,
            fecha_seguimiento,
            seguimiento_completado
        );
        if let Some(titulo) = body.titulo {
            incidencia.titulo = titulo.trim().to_owned();
        }
        if let Some(descripcion) = body.descripcion {
            incidencia.descripcion = descripcion.trim().to_owned();
        }
        if let Some(consecuencias) = body.consecuencias {
            incidencia.consecuencias = api::non_blank(consecuencias);
        }
        if let Some(notas_seguimiento) = body.notas_seguimiento {
            incidencia.notas_seguimiento = api::non_blank(notas_seguimiento);
        }
    }
}

#[utoipa::path(
    put,
    path = "/incidencias/{id}",
    tag = INCIDENCIA_TAG,
    params(("id" = i64, Path, description = "Incident id")),
    request_body = IncidenciaUpdateBody,
    responses(
        (status = 200, body = IncidenciaInfo),
        (status = 400, description = "Title or description is too short or too long"),
        (status = 403, description = "Requires ADMIN or JEFE_TALLER"),
        (status = 404, description = "Incident does not exist"),
    ),
)]
async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(incidencia_id): Path<i64>,
    Json(body): Json<IncidenciaUpdateBody>,
) -> ApiResult<Json<IncidenciaInfo>> {
    api::verify_role(&client, APPROVERS)?;
    verify_texts(body.titulo.as_deref().map(str::trim), body.descripcion.as_deref().map(str::trim))?;

    state.get_connection()?.transaction(|conn| {
        let mut incidencia = find_incidencia(conn, incidencia_id)?;
        body.apply(&mut incidencia);
        incidencia.updated_at = DateTime::now();

        let incidencia: Incidencia = incidencia.save_changes(conn)?;
        tracing::info!("{} updated incident {}", client.username, incidencia.id);
        IncidenciaInfo::new(conn, incidencia).map(Json).map_err(ApiError::from)
    })
}

#[utoipa::path(
    delete,
    path = "/incidencias/{id}",
    tag = INCIDENCIA_TAG,
    params(("id" = i64, Path, description = "Incident id")),
    responses(
        (status = 204),
        (status = 403, description = "Requires ADMIN"),
        (status = 404, description = "Incident does not exist"),
    ),
)]
async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(incidencia_id): Path<i64>,
) -> ApiResult<StatusCode> {
    api::verify_role(&client, ADMIN)?;
    state.get_connection()?.transaction(|conn| {
        let deleted = diesel::delete(incidencia_empleado::table.find(incidencia_id)).execute(conn)?;
        if deleted == 0 {
            return Err(ApiError::NotFound(ResourceType::Incidencia));
        }
        tracing::info!("{} deleted incident {incidencia_id}", client.username);
        Ok(StatusCode::NO_CONTENT)
    })
}

/// Counts the incidents of an employee by type and severity.
#[utoipa::path(
    get,
    path = "/incidencias/estadisticas/empleado/{id}",
    tag = INCIDENCIA_TAG,
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, body = IncidenciaStats),
        (status = 403, description = "Requires ADMIN or JEFE_TALLER"),
        (status = 404, description = "Employee does not exist"),
    ),
)]
async fn employee_stats(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(empleado_id): Path<i64>,
) -> ApiResult<Json<IncidenciaStats>> {
    api::verify_role(&client, APPROVERS)?;
    state.get_connection()?.transaction(|conn| {
        let empleado = find_employee(conn, empleado_id)?;
        let incidencias: Vec<(TipoIncidencia, Severidad)> = incidencia_empleado::table
            .select((incidencia_empleado::tipo, incidencia_empleado::severidad))
            .filter(incidencia_empleado::empleado_id.eq(empleado.id))
            .load(conn)?;
        Ok(Json(IncidenciaStats::new(&empleado, incidencias)))
    })
}

/// Checks the title and description of an incident, when given. Both are expected trimmed.
fn verify_texts(titulo: Option<&str>, descripcion: Option<&str>) -> ApiResult<()> {
    if let Some(titulo) = titulo {
        api::verify_length("titulo", titulo, MIN_TITULO_LENGTH, MAX_TITULO_LENGTH)?;
    }
    if let Some(descripcion) = descripcion {
        api::verify_min_length("descripcion", descripcion, MIN_DESCRIPCION_LENGTH)?;
    }
    Ok(())
}

fn find_incidencia(conn: &mut PgConnection, incidencia_id: i64) -> ApiResult<Incidencia> {
    incidencia_empleado::table
        .find(incidencia_id)
        .select(Incidencia::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Incidencia))
}

fn find_employee(conn: &mut PgConnection, empleado_id: i64) -> ApiResult<User> {
    usuario::table
        .find(empleado_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Empleado))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::enums::Rol;
    use crate::test::*;
    use axum::http::header::AUTHORIZATION;
    use serde_json::{Value, json};
    use serial_test::{parallel, serial};

    #[test]
    fn text_validation() {
        assert!(verify_texts(Some("Retardo"), Some("Llegó 30 minutos tarde")).is_ok());
        assert!(verify_texts(None, None).is_ok());
        assert!(matches!(
            verify_texts(Some("No"), None),
            Err(ApiError::InvalidLength { field: "titulo", min: 3, max: 200 })
        ));
        assert!(verify_texts(Some("a".repeat(200).as_str()), None).is_ok());
        assert!(verify_texts(Some("a".repeat(201).as_str()), None).is_err());
        assert!(matches!(
            verify_texts(None, Some("Muy corto")),
            Err(ApiError::TooShort { field: "descripcion", min: 10 })
        ));
    }

    #[tokio::test]
    #[parallel]
    async fn requires_authentication() {
        let server = test_server();
        let response = server.get("/api/v1/incidencias/mis-incidencias").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server.get("/api/v1/incidencias/estadisticas/empleado/1").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    fn incident_body(empleado: &User, tipo: &str, severidad: &str) -> Value {
        json!({
            "empleado_id": empleado.id,
            "fecha_incidencia": "2025-03-10",
            "tipo": tipo,
            "severidad": severidad,
            "titulo": "Retardo en la entrada",
            "descripcion": "Llegó 30 minutos después del inicio del turno",
        })
    }

    #[tokio::test]
    #[serial]
    async fn roles_and_visibility() {
        let Some(state) = database_state() else { return };
        let (admin, jefe, tecnico, otro) = seed(&state, |conn| {
            Ok((
                create_test_user(conn, "admin", Rol::Admin)?,
                create_test_user(conn, "jefe", Rol::JefeTaller)?,
                create_test_user(conn, "tecnico", Rol::Tecnico)?,
                create_test_user(conn, "otro", Rol::Tecnico)?,
            ))
        });
        let server = server_for(state);

        let response = server
            .post("/api/v1/incidencias")
            .add_header(AUTHORIZATION, token_for(&tecnico))
            .json(&incident_body(&otro, "RETARDO", "LEVE"))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["name"], "MissingRole");

        let mut missing_employee = incident_body(&tecnico, "RETARDO", "LEVE");
        missing_employee["empleado_id"] = json!(999999);
        let response = server
            .post("/api/v1/incidencias")
            .add_header(AUTHORIZATION, token_for(&jefe))
            .json(&missing_employee)
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["name"], "EmployeeNotFound");

        let response = server
            .post("/api/v1/incidencias")
            .add_header(AUTHORIZATION, token_for(&jefe))
            .json(&incident_body(&tecnico, "RETARDO", "LEVE"))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let incidencia = response.json::<Value>();
        assert_eq!(incidencia["empleado_nombre"], "tecnico");
        assert_eq!(incidencia["registrado_por_id"], jefe.id);
        assert_eq!(incidencia["registrado_por_nombre"], "jefe");
        assert_eq!(incidencia["seguimiento_completado"], false);
        let url = format!("/api/v1/incidencias/{}", incidencia["id"]);

        // Non-approvers only ever see their own incidents
        let list = |user: &User| {
            server
                .get("/api/v1/incidencias")
                .add_query_param("empleado_id", tecnico.id)
                .add_header(AUTHORIZATION, token_for(user))
        };
        assert_eq!(list(&tecnico).await.json::<Vec<Value>>().len(), 1);
        assert_eq!(list(&otro).await.json::<Vec<Value>>().len(), 0);
        assert_eq!(list(&jefe).await.json::<Vec<Value>>().len(), 1);

        let response = server
            .get("/api/v1/incidencias/mis-incidencias")
            .add_header(AUTHORIZATION, token_for(&tecnico))
            .await;
        assert_eq!(response.json::<Vec<Value>>().len(), 1);

        let response = server.get(&url).add_header(AUTHORIZATION, token_for(&tecnico)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let response = server.get(&url).add_header(AUTHORIZATION, token_for(&otro)).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["name"], "Forbidden");

        let follow_up = json!({"seguimiento_completado": true, "notas_seguimiento": "Revisado con el empleado"});
        let response = server
            .put(&url)
            .add_header(AUTHORIZATION, token_for(&tecnico))
            .json(&follow_up)
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let response = server
            .put(&url)
            .add_header(AUTHORIZATION, token_for(&jefe))
            .json(&follow_up)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let updated = response.json::<Value>();
        assert_eq!(updated["seguimiento_completado"], true);
        assert_eq!(updated["notas_seguimiento"], "Revisado con el empleado");
        assert_eq!(updated["titulo"], "Retardo en la entrada");

        let response = server
            .put(&url)
            .add_header(AUTHORIZATION, token_for(&jefe))
            .json(&json!({"titulo": "  "}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server.delete(&url).add_header(AUTHORIZATION, token_for(&jefe)).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let response = server.delete(&url).add_header(AUTHORIZATION, token_for(&admin)).await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

        let response = server.get(&url).add_header(AUTHORIZATION, token_for(&admin)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["name"], "IncidentNotFound");
        let response = server.delete(&url).add_header(AUTHORIZATION, token_for(&admin)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn employee_statistics() {
        let Some(state) = database_state() else { return };
        let (jefe, tecnico) = seed(&state, |conn| {
            Ok((
                create_test_user(conn, "jefe", Rol::JefeTaller)?,
                create_test_user(conn, "tecnico", Rol::Tecnico)?,
            ))
        });
        let server = server_for(state);

        for (tipo, severidad) in [("RETARDO", "LEVE"), ("RETARDO", "MODERADA"), ("RECONOCIMIENTO", "POSITIVA")] {
            let response = server
                .post("/api/v1/incidencias")
                .add_header(AUTHORIZATION, token_for(&jefe))
                .json(&incident_body(&tecnico, tipo, severidad))
                .await;
            assert_eq!(response.status_code(), StatusCode::CREATED);
        }

        let url = format!("/api/v1/incidencias/estadisticas/empleado/{}", tecnico.id);
        let response = server.get(&url).add_header(AUTHORIZATION, token_for(&jefe)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let stats = response.json::<Value>();
        assert_eq!(stats["nombre_completo"], "tecnico");
        assert_eq!(stats["total_incidencias"], 3);
        assert_eq!(stats["por_tipo"], json!({"RETARDO": 2, "RECONOCIMIENTO": 1}));
        assert_eq!(stats["por_severidad"], json!({"LEVE": 1, "MODERADA": 1, "POSITIVA": 1}));

        let response = server
            .get("/api/v1/incidencias")
            .add_query_param("severidad", "POSITIVA")
            .add_header(AUTHORIZATION, token_for(&jefe))
            .await;
        assert_eq!(response.json::<Vec<Value>>().len(), 1);

        let response = server.get(&url).add_header(AUTHORIZATION, token_for(&tecnico)).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let response = server
            .get("/api/v1/incidencias/estadisticas/empleado/999999")
            .add_header(AUTHORIZATION, token_for(&jefe))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["name"], "EmployeeNotFound");
    }
}
