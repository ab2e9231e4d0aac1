use crate::api::doc::SUCURSAL_TAG;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{self, ADMIN, FRONT_DESK, STAFF};
use crate::app::AppState;
use crate::auth::Client;
use crate::config::{Config, RegexType};
use crate::model::enums::ResourceType;
use crate::model::sucursal::{NewSucursal, Sucursal};
use crate::resource::sucursal::SucursalInfo;
use crate::schema::sucursal;
use crate::time::DateTime;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list, create))
        .routes(routes!(get, update, delete))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct SucursalListParams {
    /// Only branches of this client.
    cliente_id: Option<i64>,
    activo: Option<bool>,
    skip: Option<i64>,
    limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/sucursales",
    tag = SUCURSAL_TAG,
    params(SucursalListParams),
    responses(
        (status = 200, body = Vec<SucursalInfo>),
        (status = 403, description = "Requires ADMIN, RECEPCION or TECNICO"),
    ),
)]
async fn list(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<SucursalListParams>,
) -> ApiResult<Json<Vec<SucursalInfo>>> {
    api::verify_role(&client, STAFF)?;

    let (offset, limit) = api::page(params.skip, params.limit);
    let mut query = sucursal::table.select(Sucursal::as_select()).into_boxed();
    if let Some(cliente_id) = params.cliente_id {
        query = query.filter(sucursal::cliente_id.eq(cliente_id));
    }
    if let Some(activo) = params.activo {
        query = query.filter(sucursal::activo.eq(activo));
    }

    state.get_connection()?.transaction(|conn| {
        let sucursales: Vec<Sucursal> = query.order_by(sucursal::id).offset(offset).limit(limit).load(conn)?;
        SucursalInfo::new_batch(conn, sucursales)
            .map(Json)
            .map_err(ApiError::from)
    })
}

#[utoipa::path(
    get,
    path = "/sucursales/{id}",
    tag = SUCURSAL_TAG,
    params(("id" = i64, Path, description = "Branch id")),
    responses(
        (status = 200, body = SucursalInfo),
        (status = 403, description = "Requires ADMIN, RECEPCION or TECNICO"),
        (status = 404, description = "Branch does not exist"),
    ),
)]
async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(sucursal_id): Path<i64>,
) -> ApiResult<Json<SucursalInfo>> {
    api::verify_role(&client, STAFF)?;

    state.get_connection()?.transaction(|conn| {
        let sucursal = find_sucursal(conn, sucursal_id)?;
        SucursalInfo::new(conn, sucursal).map(Json).map_err(ApiError::from)
    })
}

/// Request body for creating a branch. Blank optional fields are stored as absent.
#[derive(Deserialize, ToSchema)]
struct SucursalCreateBody {
    /// Client the branch belongs to.
    cliente_id: i64,
    /// Between 2 and 200 characters.
    nombre_sucursal: String,
    /// Client's internal code for the branch.
    codigo_sucursal: Option<String>,
    telefono: Option<String>,
    telefono_alternativo: Option<String>,
    email: Option<String>,
    calle: Option<String>,
    numero_exterior: Option<String>,
    numero_interior: Option<String>,
    colonia: Option<String>,
    codigo_postal: Option<String>,
    ciudad: Option<String>,
    estado: Option<String>,
    notas: Option<String>,
    #[serde(default = "active_by_default")]
    activo: bool,
}

fn active_by_default() -> bool {
    true
}

impl SucursalCreateBody {
    fn normalized(self) -> Self {
        Self {
            nombre_sucursal: self.nombre_sucursal.trim().to_owned(),
            codigo_sucursal: api::non_blank(self.codigo_sucursal),
            telefono: api::non_blank(self.telefono),
            telefono_alternativo: api::non_blank(self.telefono_alternativo),
            email: api::non_blank(self.email),
            calle: api::non_blank(self.calle),
            numero_exterior: api::non_blank(self.numero_exterior),
            numero_interior: api::non_blank(self.numero_interior),
            colonia: api::non_blank(self.colonia),
            codigo_postal: api::non_blank(self.codigo_postal),
            ciudad: api::non_blank(self.ciudad),
            estado: api::non_blank(self.estado),
            notas: api::non_blank(self.notas),
            ..self
        }
    }

    fn text(&self) -> SucursalText<'_> {
        SucursalText {
            nombre_sucursal: Some(&self.nombre_sucursal),
            codigo_sucursal: self.codigo_sucursal.as_deref(),
            telefono: self.telefono.as_deref(),
            telefono_alternativo: self.telefono_alternativo.as_deref(),
            email: self.email.as_deref(),
            calle: self.calle.as_deref(),
            numero_exterior: self.numero_exterior.as_deref(),
            numero_interior: self.numero_interior.as_deref(),
            colonia: self.colonia.as_deref(),
            codigo_postal: self.codigo_postal.as_deref(),
            ciudad: self.ciudad.as_deref(),
            estado: self.estado.as_deref(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/sucursales",
    tag = SUCURSAL_TAG,
    request_body = SucursalCreateBody,
    responses(
        (status = 201, body = SucursalInfo),
        (status = 400, description = "A field is invalid"),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
        (status = 404, description = "Client does not exist"),
    ),
)]
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Json(body): Json<SucursalCreateBody>,
) -> ApiResult<(StatusCode, Json<SucursalInfo>)> {
    api::verify_role(&client, FRONT_DESK)?;

    let body = body.normalized();
    body.text().validate(&state.config)?;
    let new_sucursal = NewSucursal {
        cliente_id: body.cliente_id,
        nombre_sucursal: &body.nombre_sucursal,
        codigo_sucursal: body.codigo_sucursal.as_deref(),
        telefono: body.telefono.as_deref(),
        telefono_alternativo: body.telefono_alternativo.as_deref(),
        email: body.email.as_deref(),
        calle: body.calle.as_deref(),
        numero_exterior: body.numero_exterior.as_deref(),
        numero_interior: body.numero_interior.as_deref(),
        colonia: body.colonia.as_deref(),
        codigo_postal: body.codigo_postal.as_deref(),
        ciudad: body.ciudad.as_deref(),
        estado: body.estado.as_deref(),
        notas: body.notas.as_deref(),
        activo: body.activo,
    };

    let info = state.get_connection()?.transaction(|conn| {
        let sucursal = new_sucursal
            .insert_into(sucursal::table)
            .returning(Sucursal::as_returning())
            .get_result(conn);
        let sucursal = api::error::map_foreign_key_violation(sucursal, ResourceType::Cliente)?;
        tracing::info!("Created branch {} for client {}", sucursal.id, sucursal.cliente_id);
        SucursalInfo::new(conn, sucursal).map_err(ApiError::from)
    })?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// Request body for updating a branch. Only provided fields are changed and
/// `null` or blank text clears an optional field. The owning client can't change.
#[derive(Deserialize, ToSchema)]
struct SucursalUpdateBody {
    nombre_sucursal: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    codigo_sucursal: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    telefono: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    telefono_alternativo: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    email: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    calle: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    numero_exterior: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    numero_interior: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    colonia: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    codigo_postal: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    ciudad: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    estado: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    notas: Option<Option<String>>,
    activo: Option<bool>,
}

impl SucursalUpdateBody {
    fn normalized(self) -> Self {
        let clear_blank = |value: Option<Option<String>>| value.map(api::non_blank);
        Self {
            nombre_sucursal: self.nombre_sucursal.map(|nombre| nombre.trim().to_owned()),
            codigo_sucursal: clear_blank(self.codigo_sucursal),
            telefono: clear_blank(self.telefono),
            telefono_alternativo: clear_blank(self.telefono_alternativo),
            email: clear_blank(self.email),
            calle: clear_blank(self.calle),
            numero_exterior: clear_blank(self.numero_exterior),
            numero_interior: clear_blank(self.numero_interior),
            colonia: clear_blank(self.colonia),
            codigo_postal: clear_blank(self.codigo_postal),
            ciudad: clear_blank(self.ciudad),
            estado: clear_blank(self.estado),
            notas: clear_blank(self.notas),
            ..self
        }
    }

    fn text(&self) -> SucursalText<'_> {
        SucursalText {
            nombre_sucursal: self.nombre_sucursal.as_deref(),
            codigo_sucursal: api::new_value(&self.codigo_sucursal),
            telefono: api::new_value(&self.telefono),
            telefono_alternativo: api::new_value(&self.telefono_alternativo),
            email: api::new_value(&self.email),
            calle: api::new_value(&self.calle),
            numero_exterior: api::new_value(&self.numero_exterior),
            numero_interior: api::new_value(&self.numero_interior),
            colonia: api::new_value(&self.colonia),
            codigo_postal: api::new_value(&self.codigo_postal),
            ciudad: api::new_value(&self.ciudad),
            estado: api::new_value(&self.estado),
        }
    }

    fn apply(self, sucursal: &mut Sucursal) {
        let body = self;
        api::set!(
            body, sucursal;
            nombre_sucursal,
            codigo_sucursal,
            telefono,
            telefono_alternativo,
            email,
            calle,
            numero_exterior,
            numero_interior,
            colonia,
            codigo_postal,
            ciudad,
            estado,
            notas,
            activo
        );
    }
}

#[utoipa::path(
    put,
    path = "/sucursales/{id}",
    tag = SUCURSAL_TAG,
    params(("id" = i64, Path, description = "Branch id")),
    request_body = SucursalUpdateBody,
    responses(
        (status = 200, body = SucursalInfo),
        (status = 400, description = "A field is invalid"),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
        (status = 404, description = "Branch does not exist"),
    ),
)]
async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(sucursal_id): Path<i64>,
    Json(body): Json<SucursalUpdateBody>,
) -> ApiResult<Json<SucursalInfo>> {
    api::verify_role(&client, FRONT_DESK)?;

    let body = body.normalized();
    body.text().validate(&state.config)?;

    state.get_connection()?.transaction(|conn| {
        let mut sucursal = find_sucursal(conn, sucursal_id)?;
        body.apply(&mut sucursal);
        sucursal.updated_at = DateTime::now();

        let sucursal: Sucursal = sucursal.save_changes(conn)?;
        SucursalInfo::new(conn, sucursal).map(Json).map_err(ApiError::from)
    })
}

/// Deletes a branch. Work orders of the branch are kept without a branch.
#[utoipa::path(
    delete,
    path = "/sucursales/{id}",
    tag = SUCURSAL_TAG,
    params(("id" = i64, Path, description = "Branch id")),
    responses(
        (status = 204),
        (status = 403, description = "Requires ADMIN"),
        (status = 404, description = "Branch does not exist"),
    ),
)]
async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(sucursal_id): Path<i64>,
) -> ApiResult<StatusCode> {
    api::verify_role(&client, ADMIN)?;

    let deleted = diesel::delete(sucursal::table.find(sucursal_id)).execute(&mut state.get_connection()?)?;
    if deleted == 0 {
        return Err(ApiError::NotFound(ResourceType::Sucursal));
    }
    tracing::info!("Deleted branch {sucursal_id}");
    Ok(StatusCode::NO_CONTENT)
}

/// Text fields of a branch body, as they will be stored.
struct SucursalText<'a> {
    nombre_sucursal: Option<&'a str>,
    codigo_sucursal: Option<&'a str>,
    telefono: Option<&'a str>,
    telefono_alternativo: Option<&'a str>,
    email: Option<&'a str>,
    calle: Option<&'a str>,
    numero_exterior: Option<&'a str>,
    numero_interior: Option<&'a str>,
    colonia: Option<&'a str>,
    codigo_postal: Option<&'a str>,
    ciudad: Option<&'a str>,
    estado: Option<&'a str>,
}

impl SucursalText<'_> {
    fn validate(&self, config: &Config) -> ApiResult<()> {
        if let Some(nombre_sucursal) = self.nombre_sucursal {
            api::verify_length("nombre_sucursal", nombre_sucursal, 2, 200)?;
        }
        api::verify_max_length("codigo_sucursal", self.codigo_sucursal, 50)?;
        api::verify_max_length("telefono", self.telefono, 15)?;
        api::verify_max_length("telefono_alternativo", self.telefono_alternativo, 15)?;
        if let Some(email) = self.email {
            api::verify_matches_regex(config, email, RegexType::Email)?;
        }
        api::verify_max_length("calle", self.calle, 200)?;
        api::verify_max_length("numero_exterior", self.numero_exterior, 20)?;
        api::verify_max_length("numero_interior", self.numero_interior, 20)?;
        api::verify_max_length("colonia", self.colonia, 100)?;
        api::verify_max_length("codigo_postal", self.codigo_postal, 5)?;
        api::verify_max_length("ciudad", self.ciudad, 100)?;
        api::verify_max_length("estado", self.estado, 100)
    }
}

fn find_sucursal(conn: &mut PgConnection, sucursal_id: i64) -> ApiResult<Sucursal> {
    sucursal::table
        .find(sucursal_id)
        .select(Sucursal::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Sucursal))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use serde_json::json;

    #[test]
    fn create_defaults() {
        let body: SucursalCreateBody = serde_json::from_value(json!({
            "cliente_id": 7,
            "nombre_sucursal": "  Matriz Centro ",
            "codigo_sucursal": "",
        }))
        .unwrap();
        let body = body.normalized();
        assert!(body.activo);
        assert_eq!(body.nombre_sucursal, "Matriz Centro");
        assert!(body.codigo_sucursal.is_none());
        assert!(body.text().validate(&config::test_config()).is_ok());
    }

    #[test]
    fn validation() {
        let config = config::test_config();
        let body: SucursalUpdateBody = serde_json::from_value(json!({"nombre_sucursal": "X"})).unwrap();
        assert!(matches!(
            body.normalized().text().validate(&config),
            Err(ApiError::InvalidLength { field: "nombre_sucursal", .. })
        ));

        let body: SucursalUpdateBody = serde_json::from_value(json!({"telefono": "5512345678901234"})).unwrap();
        assert!(matches!(
            body.normalized().text().validate(&config),
            Err(ApiError::TooLong { field: "telefono", max: 15 })
        ));

        let body: SucursalUpdateBody = serde_json::from_value(json!({"email": "sucursal@"})).unwrap();
        assert!(body.normalized().text().validate(&config).is_err());
    }
}
