use crate::api::doc::USER_TAG;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{self, ADMIN, FRONT_DESK};
use crate::app::AppState;
use crate::auth::{Client, password};
use crate::config::{Config, RegexType};
use crate::model::enums::{ResourceProperty, ResourceType, Rol};
use crate::model::user::{NewUser, User};
use crate::resource::user::UserInfo;
use crate::schema::usuario;
use crate::time::DateTime;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rust_decimal::Decimal;
use serde::Deserialize;
use strum::IntoEnumIterator;
use time::Date;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list, create))
        .routes(routes!(list_roles))
        .routes(routes!(get, update, delete))
}

const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 100;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct UserListParams {
    /// Only users with this role.
    rol: Option<Rol>,
    activo: Option<bool>,
    skip: Option<i64>,
    limit: Option<i64>,
}

/// Lists users, ordered by id.
///
/// Front desk staff use this list to assign technicians to work orders.
#[utoipa::path(
    get,
    path = "/users",
    tag = USER_TAG,
    params(UserListParams),
    responses(
        (status = 200, body = Vec<UserInfo>),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
    ),
)]
async fn list(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<UserListParams>,
) -> ApiResult<Json<Vec<UserInfo>>> {
    api::verify_role(&client, FRONT_DESK)?;

    let (offset, limit) = api::page(params.skip, params.limit);
    let mut query = usuario::table.select(User::as_select()).into_boxed();
    if let Some(rol) = params.rol {
        query = query.filter(usuario::rol.eq(rol));
    }
    if let Some(activo) = params.activo {
        query = query.filter(usuario::activo.eq(activo));
    }

    let users: Vec<User> = query
        .order_by(usuario::id)
        .offset(offset)
        .limit(limit)
        .load(&mut state.get_connection()?)?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// Lists the names of every role.
#[utoipa::path(
    get,
    path = "/users/roles/list",
    tag = USER_TAG,
    responses((status = 200, body = Vec<Rol>)),
)]
async fn list_roles() -> Json<Vec<Rol>> {
    Json(Rol::iter().collect())
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = USER_TAG,
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, body = UserInfo),
        (status = 403, description = "Requires ADMIN"),
        (status = 404, description = "User does not exist"),
    ),
)]
async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<UserInfo>> {
    api::verify_role(&client, ADMIN)?;

    let mut conn = state.get_connection()?;
    let user = find_user(&mut conn, user_id)?;
    Ok(Json(UserInfo::from(user)))
}

/// Request body for creating a user.
#[derive(Deserialize, ToSchema)]
pub struct UserCreateBody {
    /// Between 3 and 50 letters, digits, dots, dashes or underscores.
    username: String,
    email: String,
    nombre_completo: String,
    /// Between 6 and 100 characters.
    password: String,
    /// Defaults to RECEPCION.
    #[serde(default = "default_rol")]
    rol: Rol,
    /// Four digit login code for technicians.
    codigo: Option<String>,
    /// Hiring date, used to compute vacation days.
    fecha_ingreso: Option<Date>,
    /// Vacation days carried over from previous years.
    dias_vacaciones_pendientes: Option<Decimal>,
}

impl UserCreateBody {
    /// Body of an administrator account created from the command line.
    pub fn administrator(username: String, email: String, nombre_completo: String, password: String) -> Self {
        Self {
            username,
            email,
            nombre_completo,
            password,
            rol: Rol::Admin,
            codigo: None,
            fecha_ingreso: None,
            dias_vacaciones_pendientes: None,
        }
    }

    pub fn rol(&self) -> Rol {
        self.rol
    }
}

fn default_rol() -> Rol {
    Rol::Recepcion
}

#[utoipa::path(
    post,
    path = "/users",
    tag = USER_TAG,
    request_body = UserCreateBody,
    responses(
        (status = 201, body = UserInfo),
        (status = 400, description = "A field is invalid or already in use"),
        (status = 403, description = "Requires ADMIN"),
    ),
)]
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Json(body): Json<UserCreateBody>,
) -> ApiResult<(StatusCode, Json<UserInfo>)> {
    api::verify_role(&client, ADMIN)?;

    let user = create_user(&state, body)?;
    Ok((StatusCode::CREATED, Json(UserInfo::from(user))))
}

/// Validates `body` and inserts the user it describes. Shared by user creation
/// and public registration.
pub fn create_user(state: &AppState, body: UserCreateBody) -> ApiResult<User> {
    let codigo = api::non_blank(body.codigo);
    validate_username(&state.config, &body.username)?;
    validate_email(&state.config, &body.email)?;
    validate_full_name(&body.nombre_completo)?;
    validate_password(&body.password)?;
    if let Some(codigo) = codigo.as_deref() {
        api::verify_matches_regex(&state.config, codigo, RegexType::TechnicianCode)?;
    }
    let dias_vacaciones_pendientes = body.dias_vacaciones_pendientes.unwrap_or_default();
    api::verify_amount("dias_vacaciones_pendientes", Some(dias_vacaciones_pendientes), api::max_days())?;

    let password_hash = password::hash_password(&state.config, &body.password)?;
    let new_user = NewUser {
        username: &body.username,
        email: &body.email,
        nombre_completo: body.nombre_completo.trim(),
        password_hash: &password_hash,
        rol: body.rol,
        activo: true,
        codigo: codigo.as_deref(),
        fecha_ingreso: body.fecha_ingreso,
        dias_vacaciones_pendientes,
    };

    state.get_connection()?.transaction(|conn| {
        verify_available(conn, None, Some(&body.username), Some(&body.email), codigo.as_deref())?;
        let user = new_user
            .insert_into(usuario::table)
            .returning(User::as_returning())
            .get_result(conn);
        api::error::map_unique_violation(user, ResourceProperty::Username)
    })
}

/// Request body for updating a user. Only provided fields are changed.
#[derive(Deserialize, ToSchema)]
struct UserUpdateBody {
    email: Option<String>,
    nombre_completo: Option<String>,
    rol: Option<Rol>,
    activo: Option<bool>,
    /// New password. Between 6 and 100 characters.
    password: Option<String>,
    /// Technician login code. `null` removes it.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    codigo: Option<Option<String>>,
    /// Hiring date. `null` removes it.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Date>)]
    fecha_ingreso: Option<Option<Date>>,
    dias_vacaciones_pendientes: Option<Decimal>,
}

/// Updates an existing user.
///
/// The last administrator can't lose the ADMIN role and the last active
/// administrator can't be deactivated.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = USER_TAG,
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateBody,
    responses(
        (status = 200, body = UserInfo),
        (status = 400, description = "A field is invalid or already in use, or the change would leave no administrator"),
        (status = 403, description = "Requires ADMIN"),
        (status = 404, description = "User does not exist"),
    ),
)]
async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(user_id): Path<i64>,
    Json(body): Json<UserUpdateBody>,
) -> ApiResult<Json<UserInfo>> {
    api::verify_role(&client, ADMIN)?;

    if let Some(email) = body.email.as_deref() {
        validate_email(&state.config, email)?;
    }
    if let Some(nombre_completo) = body.nombre_completo.as_deref() {
        validate_full_name(nombre_completo)?;
    }
    let codigo = body.codigo.map(api::non_blank);
    if let Some(Some(codigo)) = codigo.as_ref() {
        api::verify_matches_regex(&state.config, codigo, RegexType::TechnicianCode)?;
    }
    api::verify_amount("dias_vacaciones_pendientes", body.dias_vacaciones_pendientes, api::max_days())?;
    let password_hash = body
        .password
        .as_deref()
        .map(|password| {
            validate_password(password)?;
            password::hash_password(&state.config, password).map_err(ApiError::from)
        })
        .transpose()?;

    let user = state.get_connection()?.transaction(|conn| {
        let mut user = find_user(conn, user_id)?;
        if user.rol == Rol::Admin {
            if body.rol.is_some_and(|rol| rol != Rol::Admin) && admin_count(conn, user.activo)? <= 1 {
                return Err(ApiError::ChangeLastAdminRole);
            }
            if body.activo == Some(false) && user.activo && admin_count(conn, true)? <= 1 {
                return Err(ApiError::DeactivateLastAdmin);
            }
        }
        let new_codigo = codigo.as_ref().and_then(|codigo| codigo.as_deref());
        verify_available(conn, Some(user.id), None, body.email.as_deref(), new_codigo)?;

        if let Some(email) = body.email {
            user.email = email;
        }
        if let Some(nombre_completo) = body.nombre_completo {
            user.nombre_completo = nombre_completo.trim().to_owned();
        }
        if let Some(rol) = body.rol {
            user.rol = rol;
        }
        if let Some(activo) = body.activo {
            user.activo = activo;
        }
        if let Some(password_hash) = password_hash {
            user.password_hash = password_hash;
        }
        if let Some(codigo) = codigo {
            user.codigo = codigo;
        }
        if let Some(fecha_ingreso) = body.fecha_ingreso {
            user.fecha_ingreso = fecha_ingreso;
        }
        if let Some(dias) = body.dias_vacaciones_pendientes {
            user.dias_vacaciones_pendientes = dias;
        }

        user.updated_at = DateTime::now();
        api::error::map_unique_violation(user.save_changes::<User>(conn), ResourceProperty::UserEmail)
    })?;
    Ok(Json(UserInfo::from(user)))
}

/// Deletes a user.
///
/// Users can't delete themselves and the last administrator can't be deleted.
/// Users that received work orders can only be deactivated.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = USER_TAG,
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204),
        (status = 400, description = "User is the client, the last administrator or has work orders"),
        (status = 403, description = "Requires ADMIN"),
        (status = 404, description = "User does not exist"),
    ),
)]
async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(user_id): Path<i64>,
) -> ApiResult<StatusCode> {
    api::verify_role(&client, ADMIN)?;
    if user_id == client.id {
        return Err(ApiError::DeleteSelf);
    }

    state.get_connection()?.transaction(|conn| {
        let user = find_user(conn, user_id)?;
        if user.rol == Rol::Admin && admin_count(conn, user.activo)? <= 1 {
            return Err(ApiError::DeleteLastAdmin);
        }
        match diesel::delete(usuario::table.find(user.id)).execute(conn) {
            Ok(_) => Ok(StatusCode::NO_CONTENT),
            Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(ApiError::UserHasOrders),
            Err(err) => Err(err.into()),
        }
    })
}

fn find_user(conn: &mut PgConnection, user_id: i64) -> ApiResult<User> {
    usuario::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Usuario))
}

/// Counts administrators, optionally only the active ones.
///
/// Guards on an active administrator count only active ones, so that an
/// inactive administrator never stands in for the last active one.
pub fn admin_count(conn: &mut PgConnection, only_active: bool) -> QueryResult<i64> {
    let admins = usuario::table.filter(usuario::rol.eq(Rol::Admin));
    if only_active {
        admins.filter(usuario::activo).count().get_result(conn)
    } else {
        admins.count().get_result(conn)
    }
}

/// Checks that no user other than `except` uses the given username, email or code.
fn verify_available(
    conn: &mut PgConnection,
    except: Option<i64>,
    username: Option<&str>,
    email: Option<&str>,
    codigo: Option<&str>,
) -> ApiResult<()> {
    let is_taken = |found: Option<i64>| found.is_some_and(|id| Some(id) != except);

    if let Some(username) = username {
        let found = usuario::table
            .select(usuario::id)
            .filter(usuario::username.eq(username))
            .first(conn)
            .optional()?;
        if is_taken(found) {
            return Err(ApiError::AlreadyExists(ResourceProperty::Username));
        }
    }
    if let Some(email) = email {
        let found = usuario::table
            .select(usuario::id)
            .filter(usuario::email.eq(email))
            .first(conn)
            .optional()?;
        if is_taken(found) {
            return Err(ApiError::AlreadyExists(ResourceProperty::UserEmail));
        }
    }
    if let Some(codigo) = codigo {
        let found = usuario::table
            .select(usuario::id)
            .filter(usuario::codigo.eq(codigo))
            .first(conn)
            .optional()?;
        if is_taken(found) {
            return Err(ApiError::AlreadyExists(ResourceProperty::UserCodigo));
        }
    }
    Ok(())
}

fn validate_username(config: &Config, username: &str) -> ApiResult<()> {
    api::verify_length("username", username, 3, 50)?;
    api::verify_matches_regex(config, username, RegexType::Username)
}

fn validate_email(config: &Config, email: &str) -> ApiResult<()> {
    api::verify_matches_regex(config, email, RegexType::Email)
}

fn validate_full_name(nombre_completo: &str) -> ApiResult<()> {
    api::verify_length("nombre_completo", nombre_completo.trim(), 3, 100)
}

pub fn validate_password(password: &str) -> ApiResult<()> {
    api::verify_length("password", password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::test::*;
    use axum::http::header::AUTHORIZATION;
    use serde_json::{Value, json};
    use serial_test::{parallel, serial};

    #[test]
    fn create_body_defaults() {
        let body: UserCreateBody = serde_json::from_str(
            r#"{"username": "recepcion1", "email": "r1@taller.mx", "nombre_completo": "Rosa Díaz", "password": "secreto"}"#,
        )
        .unwrap();
        assert_eq!(body.rol(), Rol::Recepcion);
        assert!(body.codigo.is_none());
        assert!(body.dias_vacaciones_pendientes.is_none());
    }

    #[test]
    fn update_body_distinguishes_null() {
        let body: UserUpdateBody = serde_json::from_str(r#"{"codigo": null, "activo": false}"#).unwrap();
        assert_eq!(body.codigo, Some(None));
        assert_eq!(body.fecha_ingreso, None);
        assert_eq!(body.activo, Some(false));

        let body: UserUpdateBody = serde_json::from_str(r#"{"fecha_ingreso": "2021-07-01"}"#).unwrap();
        assert_eq!(body.fecha_ingreso, Some(Some(time::macros::date!(2021 - 07 - 01))));
    }

    #[test]
    fn field_validation() {
        let config = config::test_config();
        assert!(validate_username(&config, "tecnico_07").is_ok());
        assert!(matches!(validate_username(&config, "ab"), Err(ApiError::InvalidLength { .. })));
        assert!(validate_username(&config, "con espacio").is_err());
        assert!(validate_email(&config, "sin-arroba").is_err());
        assert!(validate_full_name("  Al ").is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[tokio::test]
    #[parallel]
    async fn roles_require_authentication() {
        let server = test_server();
        let response = server.get("/api/v1/users/roles/list").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .delete("/api/v1/users/3")
            .add_header(AUTHORIZATION, bearer("not.a.token"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn inactive_admins_dont_count_as_last_admin() {
        let Some(state) = database_state() else { return };
        let (admin, inactivo) = seed(&state, |conn| {
            let admin = create_test_user(conn, "admin", Rol::Admin)?;
            let inactivo = create_test_user(conn, "admin_inactivo", Rol::Admin)?;
            diesel::update(usuario::table.find(inactivo.id))
                .set(usuario::activo.eq(false))
                .execute(conn)?;
            Ok((admin, inactivo))
        });

        let server = server_for(state.clone());
        let update = |user: &User, body: Value| {
            server
                .put(&format!("/api/v1/users/{}", user.id))
                .add_header(AUTHORIZATION, token_for(&admin))
                .json(&body)
        };

        let response = update(&admin, json!({"rol": "RECEPCION"})).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["name"], "ChangeLastAdminRole");

        let response = update(&admin, json!({"activo": false})).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["name"], "DeactivateLastAdmin");

        let response = server
            .delete(&format!("/api/v1/users/{}", admin.id))
            .add_header(AUTHORIZATION, token_for(&admin))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["name"], "DeleteSelf");

        // An inactive administrator can lose the role while an active one remains
        let response = update(&inactivo, json!({"rol": "TECNICO"})).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["rol"], "TECNICO");

        seed(&state, |conn| create_test_user(conn, "admin_2", Rol::Admin));
        let response = update(&admin, json!({"rol": "RECEPCION"})).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(admin_count(&mut connection_or_panic(&state), true).unwrap(), 1);
    }
}
