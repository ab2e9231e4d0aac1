use crate::api::doc::CLIENTE_TAG;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{self, ADMIN, FRONT_DESK, STAFF};
use crate::app::AppState;
use crate::auth::Client;
use crate::config::{Config, RegexType};
use crate::model::cliente::{Cliente, NewCliente};
use crate::model::enums::{ResourceProperty, ResourceType, TipoCliente};
use crate::resource::cliente::ClienteInfo;
use crate::schema::cliente;
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
        .routes(routes!(get, update, delete))
        .routes(routes!(activate))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ClienteListParams {
    /// Matches names, legal name, RFC, phone or email, ignoring case.
    buscar: Option<String>,
    activo: Option<bool>,
    skip: Option<i64>,
    limit: Option<i64>,
}

/// Lists clients, newest first.
#[utoipa::path(
    get,
    path = "/clientes",
    tag = CLIENTE_TAG,
    params(ClienteListParams),
    responses(
        (status = 200, body = Vec<ClienteInfo>),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
    ),
)]
async fn list(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<ClienteListParams>,
) -> ApiResult<Json<Vec<ClienteInfo>>> {
    api::verify_role(&client, FRONT_DESK)?;

    let (offset, limit) = api::page(params.skip, params.limit);
    let mut query = cliente::table.select(Cliente::as_select()).into_boxed();
    if let Some(buscar) = api::non_blank(params.buscar) {
        let pattern = format!("%{buscar}%");
        query = query.filter(
            cliente::nombre
                .ilike(pattern.clone())
                .or(cliente::apellido_paterno.ilike(pattern.clone()))
                .or(cliente::apellido_materno.ilike(pattern.clone()))
                .or(cliente::razon_social.ilike(pattern.clone()))
                .or(cliente::rfc.ilike(pattern.clone()))
                .or(cliente::telefono.ilike(pattern.clone()))
                .or(cliente::email.ilike(pattern)),
        );
    }
    if let Some(activo) = params.activo {
        query = query.filter(cliente::activo.eq(activo));
    }

    let clientes: Vec<Cliente> = query
        .order_by((cliente::created_at.desc(), cliente::id.desc()))
        .offset(offset)
        .limit(limit)
        .load(&mut state.get_connection()?)?;
    Ok(Json(clientes.into_iter().map(ClienteInfo::from).collect()))
}

#[utoipa::path(
    get,
    path = "/clientes/{id}",
    tag = CLIENTE_TAG,
    params(("id" = i64, Path, description = "Client id")),
    responses(
        (status = 200, body = ClienteInfo),
        (status = 403, description = "Requires ADMIN, RECEPCION or TECNICO"),
        (status = 404, description = "Client does not exist"),
    ),
)]
async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(cliente_id): Path<i64>,
) -> ApiResult<Json<ClienteInfo>> {
    api::verify_role(&client, STAFF)?;

    let mut conn = state.get_connection()?;
    let cliente = find_cliente(&mut conn, cliente_id)?;
    Ok(Json(ClienteInfo::from(cliente)))
}

/// Request body for creating a client. Blank optional fields are stored as absent.
#[derive(Deserialize, ToSchema)]
struct ClienteCreateBody {
    /// Defaults to PERSONA_FISICA.
    #[serde(default)]
    tipo_cliente: TipoCliente,
    /// Between 2 and 100 characters.
    nombre: String,
    apellido_paterno: Option<String>,
    apellido_materno: Option<String>,
    /// Legal name, used as display name of PERSONA_MORAL clients.
    razon_social: Option<String>,
    /// Mexican tax id, up to 13 characters.
    rfc: Option<String>,
    email: Option<String>,
    /// Between 10 and 15 digits.
    telefono: String,
    telefono_alternativo: Option<String>,
    calle: Option<String>,
    numero_exterior: Option<String>,
    numero_interior: Option<String>,
    colonia: Option<String>,
    codigo_postal: Option<String>,
    ciudad: Option<String>,
    estado: Option<String>,
    fecha_nacimiento: Option<Date>,
    notas: Option<String>,
    preferencias: Option<String>,
}

impl ClienteCreateBody {
    fn normalized(self) -> Self {
        Self {
            nombre: self.nombre.trim().to_owned(),
            telefono: self.telefono.trim().to_owned(),
            apellido_paterno: api::non_blank(self.apellido_paterno),
            apellido_materno: api::non_blank(self.apellido_materno),
            razon_social: api::non_blank(self.razon_social),
            rfc: api::non_blank(self.rfc),
            email: api::non_blank(self.email),
            telefono_alternativo: api::non_blank(self.telefono_alternativo),
            calle: api::non_blank(self.calle),
            numero_exterior: api::non_blank(self.numero_exterior),
            numero_interior: api::non_blank(self.numero_interior),
            colonia: api::non_blank(self.colonia),
            codigo_postal: api::non_blank(self.codigo_postal),
            ciudad: api::non_blank(self.ciudad),
            estado: api::non_blank(self.estado),
            notas: api::non_blank(self.notas),
            preferencias: api::non_blank(self.preferencias),
            ..self
        }
    }

    fn text(&self) -> ClienteText<'_> {
        ClienteText {
            nombre: Some(&self.nombre),
            apellido_paterno: self.apellido_paterno.as_deref(),
            apellido_materno: self.apellido_materno.as_deref(),
            razon_social: self.razon_social.as_deref(),
            rfc: self.rfc.as_deref(),
            email: self.email.as_deref(),
            telefono: Some(&self.telefono),
            telefono_alternativo: self.telefono_alternativo.as_deref(),
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
    path = "/clientes",
    tag = CLIENTE_TAG,
    request_body = ClienteCreateBody,
    responses(
        (status = 201, body = ClienteInfo),
        (status = 400, description = "A field is invalid, or the RFC or email is already in use"),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
    ),
)]
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Json(body): Json<ClienteCreateBody>,
) -> ApiResult<(StatusCode, Json<ClienteInfo>)> {
    api::verify_role(&client, FRONT_DESK)?;

    let body = body.normalized();
    body.text().validate(&state.config)?;
    let new_cliente = NewCliente {
        tipo_cliente: body.tipo_cliente,
        nombre: &body.nombre,
        apellido_paterno: body.apellido_paterno.as_deref(),
        apellido_materno: body.apellido_materno.as_deref(),
        razon_social: body.razon_social.as_deref(),
        rfc: body.rfc.as_deref(),
        email: body.email.as_deref(),
        telefono: &body.telefono,
        telefono_alternativo: body.telefono_alternativo.as_deref(),
        calle: body.calle.as_deref(),
        numero_exterior: body.numero_exterior.as_deref(),
        numero_interior: body.numero_interior.as_deref(),
        colonia: body.colonia.as_deref(),
        codigo_postal: body.codigo_postal.as_deref(),
        ciudad: body.ciudad.as_deref(),
        estado: body.estado.as_deref(),
        fecha_nacimiento: body.fecha_nacimiento,
        notas: body.notas.as_deref(),
        preferencias: body.preferencias.as_deref(),
    };

    let cliente = state.get_connection()?.transaction(|conn| {
        verify_available(conn, None, new_cliente.rfc, new_cliente.email)?;
        let cliente = new_cliente
            .insert_into(cliente::table)
            .returning(Cliente::as_returning())
            .get_result(conn);
        api::error::map_unique_violation(cliente, ResourceProperty::ClienteRfc)
    })?;
    tracing::info!("Created client {} ({})", cliente.id, cliente.nombre_completo());
    Ok((StatusCode::CREATED, Json(ClienteInfo::from(cliente))))
}

/// Request body for updating a client. Only provided fields are changed and
/// `null` or blank text clears an optional field.
#[derive(Deserialize, ToSchema)]
struct ClienteUpdateBody {
    tipo_cliente: Option<TipoCliente>,
    nombre: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    apellido_paterno: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    apellido_materno: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    razon_social: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    rfc: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    email: Option<Option<String>>,
    telefono: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    telefono_alternativo: Option<Option<String>>,
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
    #[schema(value_type = Option<Date>)]
    fecha_nacimiento: Option<Option<Date>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    notas: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    preferencias: Option<Option<String>>,
    activo: Option<bool>,
}

impl ClienteUpdateBody {
    fn normalized(self) -> Self {
        let clear_blank = |value: Option<Option<String>>| value.map(api::non_blank);
        Self {
            nombre: self.nombre.map(|nombre| nombre.trim().to_owned()),
            telefono: self.telefono.map(|telefono| telefono.trim().to_owned()),
            apellido_paterno: clear_blank(self.apellido_paterno),
            apellido_materno: clear_blank(self.apellido_materno),
            razon_social: clear_blank(self.razon_social),
            rfc: clear_blank(self.rfc),
            email: clear_blank(self.email),
            telefono_alternativo: clear_blank(self.telefono_alternativo),
            calle: clear_blank(self.calle),
            numero_exterior: clear_blank(self.numero_exterior),
            numero_interior: clear_blank(self.numero_interior),
            colonia: clear_blank(self.colonia),
            codigo_postal: clear_blank(self.codigo_postal),
            ciudad: clear_blank(self.ciudad),
            estado: clear_blank(self.estado),
            notas: clear_blank(self.notas),
            preferencias: clear_blank(self.preferencias),
            ..self
        }
    }

    fn text(&self) -> ClienteText<'_> {
        ClienteText {
            nombre: self.nombre.as_deref(),
            apellido_paterno: api::new_value(&self.apellido_paterno),
            apellido_materno: api::new_value(&self.apellido_materno),
            razon_social: api::new_value(&self.razon_social),
            rfc: api::new_value(&self.rfc),
            email: api::new_value(&self.email),
            telefono: self.telefono.as_deref(),
            telefono_alternativo: api::new_value(&self.telefono_alternativo),
            calle: api::new_value(&self.calle),
            numero_exterior: api::new_value(&self.numero_exterior),
            numero_interior: api::new_value(&self.numero_interior),
            colonia: api::new_value(&self.colonia),
            codigo_postal: api::new_value(&self.codigo_postal),
            ciudad: api::new_value(&self.ciudad),
            estado: api::new_value(&self.estado),
        }
    }

    fn apply(self, cliente: &mut Cliente) {
        let body = self;
        api::set!(
            body, cliente;
            tipo_cliente,
            nombre,
            apellido_paterno,
            apellido_materno,
            razon_social,
            rfc,
            email,
            telefono,
            telefono_alternativo,
            calle,
            numero_exterior,
            numero_interior,
            colonia,
            codigo_postal,
            ciudad,
            estado,
            fecha_nacimiento,
            notas,
            preferencias,
            activo
        );
    }
}

#[utoipa::path(
    put,
    path = "/clientes/{id}",
    tag = CLIENTE_TAG,
    params(("id" = i64, Path, description = "Client id")),
    request_body = ClienteUpdateBody,
    responses(
        (status = 200, body = ClienteInfo),
        (status = 400, description = "A field is invalid, or the RFC or email is already in use"),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
        (status = 404, description = "Client does not exist"),
    ),
)]
async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(cliente_id): Path<i64>,
    Json(body): Json<ClienteUpdateBody>,
) -> ApiResult<Json<ClienteInfo>> {
    api::verify_role(&client, FRONT_DESK)?;

    let body = body.normalized();
    body.text().validate(&state.config)?;

    let cliente = state.get_connection()?.transaction(|conn| {
        let mut cliente = find_cliente(conn, cliente_id)?;
        let text = body.text();
        verify_available(conn, Some(cliente.id), text.rfc, text.email)?;

        body.apply(&mut cliente);
        cliente.updated_at = DateTime::now();
        api::error::map_unique_violation(cliente.save_changes::<Cliente>(conn), ResourceProperty::ClienteRfc)
    })?;
    Ok(Json(ClienteInfo::from(cliente)))
}

/// Deactivates a client. Clients are never removed because work orders refer to them.
#[utoipa::path(
    delete,
    path = "/clientes/{id}",
    tag = CLIENTE_TAG,
    params(("id" = i64, Path, description = "Client id")),
    responses(
        (status = 204),
        (status = 403, description = "Requires ADMIN"),
        (status = 404, description = "Client does not exist"),
    ),
)]
async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(cliente_id): Path<i64>,
) -> ApiResult<StatusCode> {
    api::verify_role(&client, ADMIN)?;

    set_active(&state, cliente_id, false)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reactivates a deactivated client.
#[utoipa::path(
    post,
    path = "/clientes/{id}/activar",
    tag = CLIENTE_TAG,
    params(("id" = i64, Path, description = "Client id")),
    responses(
        (status = 200, body = ClienteInfo),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
        (status = 404, description = "Client does not exist"),
    ),
)]
async fn activate(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(cliente_id): Path<i64>,
) -> ApiResult<Json<ClienteInfo>> {
    api::verify_role(&client, FRONT_DESK)?;

    let cliente = set_active(&state, cliente_id, true)?;
    Ok(Json(ClienteInfo::from(cliente)))
}

/// Text fields of a client body, as they will be stored.
struct ClienteText<'a> {
    nombre: Option<&'a str>,
    apellido_paterno: Option<&'a str>,
    apellido_materno: Option<&'a str>,
    razon_social: Option<&'a str>,
    rfc: Option<&'a str>,
    email: Option<&'a str>,
    telefono: Option<&'a str>,
    telefono_alternativo: Option<&'a str>,
    calle: Option<&'a str>,
    numero_exterior: Option<&'a str>,
    numero_interior: Option<&'a str>,
    colonia: Option<&'a str>,
    codigo_postal: Option<&'a str>,
    ciudad: Option<&'a str>,
    estado: Option<&'a str>,
}

impl ClienteText<'_> {
    fn validate(&self, config: &Config) -> ApiResult<()> {
        if let Some(nombre) = self.nombre {
            api::verify_length("nombre", nombre, 2, 100)?;
        }
        api::verify_max_length("apellido_paterno", self.apellido_paterno, 100)?;
        api::verify_max_length("apellido_materno", self.apellido_materno, 100)?;
        api::verify_max_length("razon_social", self.razon_social, 200)?;
        if let Some(rfc) = self.rfc {
            api::verify_length("rfc", rfc, 0, 13)?;
            api::verify_matches_regex(config, rfc, RegexType::Rfc)?;
        }
        if let Some(email) = self.email {
            api::verify_matches_regex(config, email, RegexType::Email)?;
        }
        if let Some(telefono) = self.telefono {
            api::verify_length("telefono", telefono, 10, 15)?;
            api::verify_matches_regex(config, telefono, RegexType::Phone)?;
        }
        if let Some(telefono) = self.telefono_alternativo {
            api::verify_matches_regex(config, telefono, RegexType::Phone)?;
        }
        api::verify_max_length("calle", self.calle, 200)?;
        api::verify_max_length("numero_exterior", self.numero_exterior, 20)?;
        api::verify_max_length("numero_interior", self.numero_interior, 20)?;
        api::verify_max_length("colonia", self.colonia, 100)?;
        if let Some(codigo_postal) = self.codigo_postal {
            api::verify_length("codigo_postal", codigo_postal, 0, 5)?;
            api::verify_matches_regex(config, codigo_postal, RegexType::PostalCode)?;
        }
        api::verify_max_length("ciudad", self.ciudad, 100)?;
        api::verify_max_length("estado", self.estado, 100)
    }
}

fn find_cliente(conn: &mut PgConnection, cliente_id: i64) -> ApiResult<Cliente> {
    cliente::table
        .find(cliente_id)
        .select(Cliente::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Cliente))
}

fn set_active(state: &AppState, cliente_id: i64, activo: bool) -> ApiResult<Cliente> {
    let cliente = diesel::update(cliente::table.find(cliente_id))
        .set((cliente::activo.eq(activo), cliente::updated_at.eq(DateTime::now())))
        .returning(Cliente::as_returning())
        .get_result(&mut state.get_connection()?)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Cliente))?;
    tracing::info!("Set client {cliente_id} active = {activo}");
    Ok(cliente)
}

/// Checks that no client other than `except` uses the given RFC or email.
fn verify_available(conn: &mut PgConnection, except: Option<i64>, rfc: Option<&str>, email: Option<&str>) -> ApiResult<()> {
    let is_taken = |found: Option<i64>| found.is_some_and(|id| Some(id) != except);

    if let Some(rfc) = rfc {
        let found = cliente::table
            .select(cliente::id)
            .filter(cliente::rfc.eq(rfc))
            .first(conn)
            .optional()?;
        if is_taken(found) {
            return Err(ApiError::AlreadyExists(ResourceProperty::ClienteRfc));
        }
    }
    if let Some(email) = email {
        let found = cliente::table
            .select(cliente::id)
            .filter(cliente::email.eq(email))
            .first(conn)
            .optional()?;
        if is_taken(found) {
            return Err(ApiError::AlreadyExists(ResourceProperty::ClienteEmail));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::test::*;
    use crate::model::enums::Rol;
    use crate::model::user::User;
    use axum::http::header::AUTHORIZATION;
    use serde_json::{Value, json};
    use serial_test::{parallel, serial};

    fn create_body(value: serde_json::Value) -> ClienteCreateBody {
        serde_json::from_value::<ClienteCreateBody>(value).unwrap().normalized()
    }

    #[test]
    fn create_validation() {
        let config = config::test_config();
        let body = create_body(json!({
            "nombre": "Ferretería Los Pinos",
            "tipo_cliente": "PERSONA_MORAL",
            "rfc": "FLP010203AB1",
            "email": "",
            "telefono": " 5512345678 ",
            "codigo_postal": "06600",
        }));
        assert_eq!(body.tipo_cliente, TipoCliente::PersonaMoral);
        assert_eq!(body.telefono, "5512345678");
        assert!(body.email.is_none());
        assert!(body.text().validate(&config).is_ok());

        let invalid = [
            json!({"nombre": "Ana", "telefono": "55123"}),
            json!({"nombre": "Ana", "telefono": "----------"}),
            json!({"nombre": "Ana", "telefono": "5512345678", "telefono_alternativo": "((((()))))"}),
            json!({"nombre": "Ana", "telefono": "5512345678", "email": "ana@correo"}),
            json!({"nombre": "Ana", "telefono": "5512345678", "rfc": "ABCDEFGHIJKLMN"}),
            json!({"nombre": "Ana", "telefono": "5512345678", "codigo_postal": "066001"}),
            json!({"nombre": "A", "telefono": "5512345678"}),
        ];
        for value in invalid {
            assert!(create_body(value).text().validate(&config).is_err());
        }
    }

    #[test]
    fn update_clears_blank_fields() {
        let body: ClienteUpdateBody =
            serde_json::from_value(json!({"email": "  ", "notas": null, "ciudad": "Puebla"})).unwrap();
        let body = body.normalized();
        assert_eq!(body.email, Some(None));
        assert_eq!(body.notas, Some(None));
        assert_eq!(body.ciudad, Some(Some(String::from("Puebla"))));
        assert_eq!(body.calle, None);
        assert!(body.text().validate(&config::test_config()).is_ok());
    }

    #[tokio::test]
    #[parallel]
    async fn requires_authentication() {
        let server = test_server();
        let response = server.get("/api/v1/clientes").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .post("/api/v1/clientes/4/activar")
            .add_header(AUTHORIZATION, bearer(&expired_token_for(1)))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn rfc_and_email_are_unique() {
        let Some(state) = database_state() else { return };
        let recepcion = seed(&state, |conn| create_test_user(conn, "recepcion", Rol::Recepcion));

        let server = server_for(state);
        let create = |body: Value| {
            server
                .post("/api/v1/clientes")
                .add_header(AUTHORIZATION, token_for(&recepcion))
                .json(&body)
        };
        let response = create(json!({
            "nombre": "Ferretería Los Pinos",
            "tipo_cliente": "PERSONA_MORAL",
            "rfc": "FLP010203AB1",
            "email": "pinos@example.com",
            "telefono": "5512345678",
        }))
        .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let response = create(json!({"nombre": "Otra", "rfc": "FLP010203AB1", "telefono": "5512345678"})).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["name"], "ClientRfcAlreadyExists");

        let response = create(json!({"nombre": "Otra", "email": "pinos@example.com", "telefono": "5512345678"})).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["name"], "ClientEmailAlreadyExists");

        let response = create(json!({"nombre": "Otra", "email": "otra@example.com", "telefono": "5512345678"})).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let otra = response.json::<Value>();
        let response = server
            .put(&format!("/api/v1/clientes/{}", otra["id"]))
            .add_header(AUTHORIZATION, token_for(&recepcion))
            .json(&json!({"email": "pinos@example.com"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["name"], "ClientEmailAlreadyExists");
    }

    #[tokio::test]
    #[serial]
    async fn delete_deactivates() {
        let Some(state) = database_state() else { return };
        let (admin, recepcion, cliente) = seed(&state, |conn| {
            let admin = create_test_user(conn, "admin", Rol::Admin)?;
            let recepcion = create_test_user(conn, "recepcion", Rol::Recepcion)?;
            let cliente = create_test_cliente(conn, "Ana")?;
            Ok((admin, recepcion, cliente))
        });

        let server = server_for(state);
        let delete = |user: &User| {
            server
                .delete(&format!("/api/v1/clientes/{}", cliente.id))
                .add_header(AUTHORIZATION, token_for(user))
        };
        assert_eq!(delete(&recepcion).await.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(delete(&admin).await.status_code(), StatusCode::NO_CONTENT);

        let response = server
            .get(&format!("/api/v1/clientes/{}", cliente.id))
            .add_header(AUTHORIZATION, token_for(&recepcion))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["activo"], false);

        let list = |activo: bool| {
            server
                .get("/api/v1/clientes")
                .add_query_param("activo", activo)
                .add_header(AUTHORIZATION, token_for(&recepcion))
        };
        assert!(list(true).await.json::<Vec<Value>>().is_empty());
        assert_eq!(list(false).await.json::<Vec<Value>>().len(), 1);

        let response = server
            .post(&format!("/api/v1/clientes/{}/activar", cliente.id))
            .add_header(AUTHORIZATION, token_for(&recepcion))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["activo"], true);
        assert_eq!(list(true).await.json::<Vec<Value>>().len(), 1);

        let response = server
            .post("/api/v1/clientes/999999/activar")
            .add_header(AUTHORIZATION, token_for(&recepcion))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}
