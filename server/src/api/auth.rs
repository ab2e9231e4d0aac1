use crate::api::doc::AUTH_TAG;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{FormOrMultipart, Json};
use crate::api::user::{self, UserCreateBody};
use crate::api;
use crate::app::AppState;
use crate::auth::header::{self, AuthenticationError};
use crate::auth::{Client, token};
use crate::config::RegexType;
use crate::model::enums::{ResourceType, Rol};
use crate::model::user::User;
use crate::resource::user::UserInfo;
use crate::schema::usuario;
use axum::extract::{Extension, State};
use axum::extract::multipart::Multipart;
use axum::http::StatusCode;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Routes that don't require a bearer token.
pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(login_json))
        .routes(routes!(login_technician))
        .routes(routes!(register))
        .routes(routes!(logout))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(me))
}

#[derive(Deserialize, ToSchema)]
struct LoginBody {
    username: String,
    password: String,
}

/// Technician login body.
#[derive(Deserialize, ToSchema)]
struct TechnicianLoginBody {
    /// Four digit code assigned to the technician.
    codigo: String,
}

#[derive(Debug, Serialize, ToSchema)]
struct TokenResponse {
    access_token: String,
    /// Always `bearer`.
    token_type: &'static str,
}

impl TokenResponse {
    fn issue(state: &AppState, user: &User) -> ApiResult<Self> {
        let access_token = token::create_access_token(&state.config, user)?;
        tracing::info!("Issued access token for {}", user.username);
        Ok(Self {
            access_token,
            token_type: "bearer",
        })
    }
}

#[derive(Serialize, ToSchema)]
struct MessageResponse {
    message: &'static str,
}

/// Logs in with a username and password sent as a form.
///
/// Accepts both `application/x-www-form-urlencoded` and `multipart/form-data` bodies.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = AUTH_TAG,
    request_body(content = LoginBody, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Username or password is incorrect"),
        (status = 403, description = "User is inactive"),
    ),
)]
async fn login(State(state): State<AppState>, body: FormOrMultipart<LoginBody>) -> ApiResult<Json<TokenResponse>> {
    let body = match body {
        FormOrMultipart::Form(body) => body,
        FormOrMultipart::Multipart(form_data) => read_login_form(form_data).await?,
    };
    authenticate(&state, &body).map(Json)
}

/// Logs in with a username and password sent as JSON.
#[utoipa::path(
    post,
    path = "/auth/login/json",
    tag = AUTH_TAG,
    request_body = LoginBody,
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Username or password is incorrect"),
        (status = 403, description = "User is inactive"),
    ),
)]
async fn login_json(State(state): State<AppState>, Json(body): Json<LoginBody>) -> ApiResult<Json<TokenResponse>> {
    authenticate(&state, &body).map(Json)
}

/// Logs in an active technician by their four digit code.
#[utoipa::path(
    post,
    path = "/auth/login/tecnico",
    tag = AUTH_TAG,
    request_body = TechnicianLoginBody,
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Code doesn't belong to an active technician"),
    ),
)]
async fn login_technician(
    State(state): State<AppState>,
    Json(body): Json<TechnicianLoginBody>,
) -> ApiResult<Json<TokenResponse>> {
    let codigo = body.codigo.trim();
    if api::verify_matches_regex(&state.config, codigo, RegexType::TechnicianCode).is_err() {
        return Err(AuthenticationError::InvalidTechnicianCode.into());
    }

    let user = header::authenticate_technician(&state, codigo)?;
    TokenResponse::issue(&state, &user).map(Json)
}

/// Registers a new user.
///
/// Administrators can only register themselves while no administrator exists.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = AUTH_TAG,
    request_body = UserCreateBody,
    responses(
        (status = 201, body = UserInfo),
        (status = 400, description = "A field is invalid or already in use"),
        (status = 403, description = "An administrator already exists"),
    ),
)]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<UserCreateBody>,
) -> ApiResult<(StatusCode, Json<UserInfo>)> {
    if body.rol() == Rol::Admin {
        let mut conn = state.get_connection()?;
        if user::admin_count(&mut conn, false)? > 0 {
            return Err(ApiError::Forbidden("registrar administradores"));
        }
    }

    let user = user::create_user(&state, body)?;
    tracing::info!("Registered user {} with role {}", user.username, user.rol);
    Ok((StatusCode::CREATED, Json(UserInfo::from(user))))
}

/// Returns the profile of the authenticated user.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = AUTH_TAG,
    responses(
        (status = 200, body = UserInfo),
        (status = 401, description = "Missing or invalid token"),
    ),
)]
async fn me(State(state): State<AppState>, Extension(client): Extension<Client>) -> ApiResult<Json<UserInfo>> {
    let user: User = usuario::table
        .find(client.id)
        .select(User::as_select())
        .first(&mut state.get_connection()?)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Usuario))?;
    Ok(Json(UserInfo::from(user)))
}

/// Tokens are stateless, so logging out only means discarding the token.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = AUTH_TAG,
    responses((status = 200, body = MessageResponse)),
)]
async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Logout exitoso",
    })
}

fn authenticate(state: &AppState, body: &LoginBody) -> ApiResult<TokenResponse> {
    let user = header::authenticate_credentials(state, &body.username, &body.password)?;
    TokenResponse::issue(state, &user)
}

async fn read_login_form(mut form_data: Multipart) -> ApiResult<LoginBody> {
    let mut username = None;
    let mut password = None;
    while let Some(field) = form_data.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("username") => username = Some(field.text().await?),
            Some("password") => password = Some(field.text().await?),
            _ => (),
        }
    }
    Ok(LoginBody {
        username: username.ok_or(ApiError::MissingFormField("username"))?,
        password: password.ok_or(ApiError::MissingFormField("password"))?,
    })
}
