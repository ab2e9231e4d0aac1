use crate::app::AppState;
use crate::auth::password;
use crate::auth::token::{self, TokenError};
use crate::model::enums::Rol;
use crate::model::user::User;
use crate::schema::usuario;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub enum AuthenticationError {
    FailedConnection(#[from] diesel::r2d2::PoolError),
    FailedQuery(#[from] diesel::result::Error),
    #[error("Usuario inactivo")]
    InactiveUser,
    #[error("No se pudo validar las credenciales")]
    InvalidAuthType,
    #[error("Código incorrecto o no corresponde a un técnico activo")]
    InvalidTechnicianCode,
    #[error("No se pudo validar las credenciales")]
    InvalidToken(#[from] TokenError),
    #[error("Not authenticated")]
    MissingCredentials,
    #[error("No se pudo validar las credenciales")]
    UnknownUser,
    #[error("Usuario o contraseña incorrectos")]
    UsernamePasswordMismatch,
}

/// Authenticates a request from the value of its `Authorization` header,
/// which must be of the form `Bearer <token>`.
///
/// The user is always reloaded from the database, so role changes and
/// deactivations take effect before the token expires.
pub fn authenticate_bearer(state: &AppState, auth: &str) -> Result<User, AuthenticationError> {
    let (auth_type, credentials) = auth.trim().split_once(' ').ok_or(AuthenticationError::InvalidAuthType)?;
    if !auth_type.eq_ignore_ascii_case("Bearer") {
        return Err(AuthenticationError::InvalidAuthType);
    }

    let claims = token::decode_access_token(&state.config, credentials.trim())?;
    let mut conn = state.get_connection()?;
    let user: User = usuario::table
        .find(claims.user_id)
        .select(User::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or(AuthenticationError::UnknownUser)?;
    if !user.activo {
        return Err(AuthenticationError::InactiveUser);
    }
    Ok(user)
}

/// Checks a username/password combination.
pub fn authenticate_credentials(state: &AppState, username: &str, password: &str) -> Result<User, AuthenticationError> {
    let mut conn = state.get_connection()?;

    // For security reasons, don't give any indication to the user if it was the password
    // or the username that was incorrect.
    let user: User = usuario::table
        .select(User::as_select())
        .filter(usuario::username.eq(username))
        .first(&mut conn)
        .optional()?
        .ok_or(AuthenticationError::UsernamePasswordMismatch)?;
    password::is_valid_password(&state.config, &user.password_hash, password)
        .map_err(|_| AuthenticationError::UsernamePasswordMismatch)?;
    if !user.activo {
        return Err(AuthenticationError::InactiveUser);
    }
    Ok(user)
}

/// Finds the active technician assigned to `codigo`.
pub fn authenticate_technician(state: &AppState, codigo: &str) -> Result<User, AuthenticationError> {
    let mut conn = state.get_connection()?;
    usuario::table
        .select(User::as_select())
        .filter(usuario::codigo.eq(codigo))
        .filter(usuario::rol.eq(Rol::Tecnico))
        .filter(usuario::activo)
        .first(&mut conn)
        .optional()?
        .ok_or(AuthenticationError::InvalidTechnicianCode)
}
