use crate::auth::header::AuthenticationError;
use crate::auth::token::TokenError;
use crate::config::RegexType;
use crate::error::ErrorKind;
use crate::model::enums::{EstadoOrden, ResourceProperty, ResourceType, Rol};
use axum::Json;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use diesel::QueryResult;
use rust_decimal::Decimal;
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum ApiError {
    #[error("{}", .0.already_exists_message())]
    AlreadyExists(ResourceProperty),
    #[error("El campo {0} está fuera del rango permitido")]
    AmountOutOfRange(&'static str),
    #[error("La sucursal no pertenece al cliente indicado")]
    BranchMismatch,
    #[error("No se puede cambiar el rol del último administrador. Debe haber al menos un administrador en el sistema.")]
    ChangeLastAdminRole,
    #[error("No se puede desactivar al último administrador activo. Debe haber al menos un administrador activo en el sistema.")]
    DeactivateLastAdmin,
    #[error("No se puede eliminar al último administrador. Debe haber al menos un administrador en el sistema.")]
    DeleteLastAdmin,
    #[error("No puedes eliminar tu propio usuario")]
    DeleteSelf,
    #[error("La fecha de fin debe ser posterior a la fecha de inicio")]
    EndBeforeStart,
    #[error("El valor '{0}' no es válido para el campo {1}")]
    ExpressionFailsRegex(String, RegexType),
    FailedAuthentication(#[from] AuthenticationError),
    FailedConnection(#[from] diesel::r2d2::PoolError),
    FailedQuery(#[from] diesel::result::Error),
    FormRejection(#[from] axum::extract::rejection::FormRejection),
    #[error("No tienes permiso para {0}")]
    Forbidden(&'static str),
    #[error("No tienes suficientes días disponibles. Disponibles: {0}")]
    InsufficientVacationDays(Decimal),
    #[error("La columna {0} no existe en el tablero")]
    InvalidBoardColumn(EstadoOrden),
    #[error("El campo {field} debe tener entre {min} y {max} caracteres")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
    },
    #[error("Tipo debe ser 'entrada' o 'salida'")]
    InvalidPhotoType,
    JsonRejection(#[from] axum::extract::rejection::JsonRejection),
    #[error("Se requiere rol: {}", join_roles(.0))]
    MissingRole(&'static [Rol]),
    #[error("No se envió ningún archivo")]
    MissingFile,
    #[error("Falta el campo {0}")]
    MissingFormField(&'static str),
    Multipart(#[from] axum::extract::multipart::MultipartError),
    MultipartRejection(#[from] axum::extract::multipart::MultipartRejection),
    #[error("El campo {0} no puede ser negativo")]
    NegativeAmount(&'static str),
    #[error("La cantidad debe ser mayor a cero")]
    NonPositiveQuantity,
    #[error("{}", .0.not_found_message())]
    NotFound(ResourceType),
    #[error("Solo se pueden eliminar órdenes en estado RECIBIDO")]
    OrderNotDeletable,
    Password(#[from] argon2::password_hash::Error),
    PathRejection(#[from] axum::extract::rejection::PathRejection),
    #[error("La cantidad de días no puede ser mayor a los días del periodo ({0})")]
    QuantityExceedsPeriod(i64),
    QueryRejection(#[from] axum::extract::rejection::QueryRejection),
    #[error("Esta solicitud ya fue procesada")]
    RequestAlreadyProcessed,
    #[error("Solo se pueden cancelar solicitudes pendientes o aprobadas que aún no inician")]
    RequestNotCancellable,
    #[error("No se puede eliminar una solicitud aprobada o tomada")]
    RequestNotDeletable,
    #[error("Solo se pueden actualizar solicitudes pendientes")]
    RequestNotPending,
    #[error("La fecha de inicio no puede ser anterior a hoy")]
    StartDateInPast,
    StdIo(#[from] std::io::Error),
    #[error("La subcategoría no pertenece a la categoría indicada")]
    SubcategoryMismatch,
    #[error("El campo {field} no puede tener más de {max} caracteres")]
    TooLong { field: &'static str, max: usize },
    #[error("El campo {field} debe tener al menos {min} caracteres")]
    TooShort { field: &'static str, min: usize },
    Token(#[from] TokenError),
    #[error("El archivo excede el tamaño máximo permitido de {0} bytes")]
    UploadTooLarge(usize),
    #[error("El archivo debe ser una imagen")]
    UnsupportedImage,
    #[error("No se puede eliminar un usuario con órdenes de trabajo registradas. Desactívalo en su lugar.")]
    UserHasOrders,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        type QueryError = diesel::result::Error;

        let query_error_status_code = |err: &QueryError| match err {
            QueryError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self {
            Self::FormRejection(err) => err.status(),
            Self::JsonRejection(err) => err.status(),
            Self::Multipart(err) => err.status(),
            Self::MultipartRejection(err) => err.status(),
            Self::PathRejection(err) => err.status(),
            Self::QueryRejection(err) => err.status(),
            Self::AlreadyExists(_)
            | Self::AmountOutOfRange(_)
            | Self::BranchMismatch
            | Self::ChangeLastAdminRole
            | Self::DeactivateLastAdmin
            | Self::DeleteLastAdmin
            | Self::DeleteSelf
            | Self::EndBeforeStart
            | Self::ExpressionFailsRegex(..)
            | Self::InsufficientVacationDays(_)
            | Self::InvalidBoardColumn(_)
            | Self::InvalidLength { .. }
            | Self::InvalidPhotoType
            | Self::MissingFile
            | Self::MissingFormField(_)
            | Self::NegativeAmount(_)
            | Self::NonPositiveQuantity
            | Self::OrderNotDeletable
            | Self::QuantityExceedsPeriod(_)
            | Self::RequestAlreadyProcessed
            | Self::RequestNotCancellable
            | Self::RequestNotDeletable
            | Self::RequestNotPending
            | Self::StartDateInPast
            | Self::SubcategoryMismatch
            | Self::TooLong { .. }
            | Self::TooShort { .. }
            | Self::UserHasOrders => StatusCode::BAD_REQUEST,
            Self::Token(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::MissingRole(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedImage => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Password(_) | Self::StdIo(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::FailedConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::FailedAuthentication(err) => match err {
                AuthenticationError::FailedConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthenticationError::FailedQuery(err) => query_error_status_code(err),
                AuthenticationError::InactiveUser => StatusCode::FORBIDDEN,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::FailedQuery(err) => query_error_status_code(err),
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "Already Exists",
            Self::AmountOutOfRange(_) => "Amount Out Of Range",
            Self::BranchMismatch => "Branch Mismatch",
            Self::ChangeLastAdminRole => "Change Last Admin Role",
            Self::DeactivateLastAdmin => "Deactivate Last Admin",
            Self::DeleteLastAdmin => "Delete Last Admin",
            Self::DeleteSelf => "Delete Self",
            Self::EndBeforeStart => "End Before Start",
            Self::ExpressionFailsRegex(..) => "Expression Fails Regex",
            Self::FailedAuthentication(_) => "Failed Authentication",
            Self::FailedConnection(_) => "Failed Connection",
            Self::FailedQuery(_) => "Failed Query",
            Self::FormRejection(_) => "Form Rejection",
            Self::Forbidden(_) => "Forbidden",
            Self::InsufficientVacationDays(_) => "Insufficient Vacation Days",
            Self::InvalidBoardColumn(_) => "Invalid Board Column",
            Self::InvalidLength { .. } => "Invalid Length",
            Self::InvalidPhotoType => "Invalid Photo Type",
            Self::JsonRejection(_) => "JSON Rejection",
            Self::MissingRole(_) => "Missing Role",
            Self::MissingFile => "Missing File",
            Self::MissingFormField(_) => "Missing Form Field",
            Self::Multipart(_) => "Multipart/Form-Data Error",
            Self::MultipartRejection(_) => "Multipart Rejection",
            Self::NegativeAmount(_) => "Negative Amount",
            Self::NonPositiveQuantity => "Non-Positive Quantity",
            Self::NotFound(_) => "Resource Not Found",
            Self::OrderNotDeletable => "Order Not Deletable",
            Self::Password(_) => "Password Error",
            Self::PathRejection(_) => "Path Rejection",
            Self::QuantityExceedsPeriod(_) => "Quantity Exceeds Period",
            Self::QueryRejection(_) => "Query Rejection",
            Self::RequestAlreadyProcessed => "Request Already Processed",
            Self::RequestNotCancellable => "Request Not Cancellable",
            Self::RequestNotDeletable => "Request Not Deletable",
            Self::RequestNotPending => "Request Not Pending",
            Self::StartDateInPast => "Start Date In Past",
            Self::StdIo(_) => "IO Error",
            Self::SubcategoryMismatch => "Subcategory Mismatch",
            Self::Token(_) => "Token Error",
            Self::TooLong { .. } | Self::TooShort { .. } => "Invalid Length",
            Self::UploadTooLarge(_) => "Upload Too Large",
            Self::UnsupportedImage => "Unsupported Image",
            Self::UserHasOrders => "User Has Orders",
        }
    }

    fn response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.to_string(),
            name: self.kind(),
            title: self.category(),
        }
    }
}

impl ErrorKind for ApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists(property) => match property {
                ResourceProperty::CategoriaNombre => "CategoryNameAlreadyExists",
                ResourceProperty::ClienteEmail => "ClientEmailAlreadyExists",
                ResourceProperty::ClienteRfc => "ClientRfcAlreadyExists",
                ResourceProperty::Folio => "FolioAlreadyExists",
                ResourceProperty::UserCodigo => "UserCodeAlreadyExists",
                ResourceProperty::UserEmail => "UserEmailAlreadyExists",
                ResourceProperty::Username => "UserNameAlreadyExists",
            },
            Self::AmountOutOfRange(_) => "AmountOutOfRange",
            Self::BranchMismatch => "BranchMismatch",
            Self::ChangeLastAdminRole => "ChangeLastAdminRole",
            Self::DeactivateLastAdmin => "DeactivateLastAdmin",
            Self::DeleteLastAdmin => "DeleteLastAdmin",
            Self::DeleteSelf => "DeleteSelf",
            Self::EndBeforeStart => "EndBeforeStart",
            Self::ExpressionFailsRegex(..) => "ExpressionFailsRegex",
            Self::FailedAuthentication(err) => err.kind(),
            Self::FailedConnection(err) => err.kind(),
            Self::FailedQuery(err) => err.kind(),
            Self::FormRejection(err) => err.kind(),
            Self::Forbidden(_) => "Forbidden",
            Self::InsufficientVacationDays(_) => "InsufficientVacationDays",
            Self::InvalidBoardColumn(_) => "InvalidBoardColumn",
            Self::InvalidLength { .. } => "InvalidLength",
            Self::InvalidPhotoType => "InvalidPhotoType",
            Self::JsonRejection(err) => err.kind(),
            Self::MissingRole(_) => "MissingRole",
            Self::MissingFile => "MissingFile",
            Self::MissingFormField(_) => "MissingFormField",
            Self::Multipart(_) => "MultipartError",
            Self::MultipartRejection(err) => err.kind(),
            Self::NegativeAmount(_) => "NegativeAmount",
            Self::NonPositiveQuantity => "NonPositiveQuantity",
            Self::NotFound(resource) => match resource {
                ResourceType::Categoria => "CategoryNotFound",
                ResourceType::Cliente => "ClientNotFound",
                ResourceType::Empleado => "EmployeeNotFound",
                ResourceType::Incidencia => "IncidentNotFound",
                ResourceType::Orden => "OrderNotFound",
                ResourceType::Solicitud => "VacationRequestNotFound",
                ResourceType::Subcategoria => "SubcategoryNotFound",
                ResourceType::Subtarea => "SubtaskNotFound",
                ResourceType::Sucursal => "BranchNotFound",
                ResourceType::Tecnico => "TechnicianNotFound",
                ResourceType::Usuario => "UserNotFound",
            },
            Self::OrderNotDeletable => "OrderNotDeletable",
            Self::Password(err) => err.kind(),
            Self::PathRejection(err) => err.kind(),
            Self::QuantityExceedsPeriod(_) => "QuantityExceedsPeriod",
            Self::QueryRejection(err) => err.kind(),
            Self::RequestAlreadyProcessed => "RequestAlreadyProcessed",
            Self::RequestNotCancellable => "RequestNotCancellable",
            Self::RequestNotDeletable => "RequestNotDeletable",
            Self::RequestNotPending => "RequestNotPending",
            Self::StartDateInPast => "StartDateInPast",
            Self::StdIo(err) => ErrorKind::kind(err),
            Self::SubcategoryMismatch => "SubcategoryMismatch",
            Self::Token(err) => err.kind(),
            Self::TooLong { .. } => "ValueTooLong",
            Self::TooShort { .. } => "ValueTooShort",
            Self::UploadTooLarge(_) => "UploadTooLarge",
            Self::UnsupportedImage => "UnsupportedImage",
            Self::UserHasOrders => "UserHasOrders",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("{}: {self}", self.kind());
        } else {
            tracing::debug!("{}: {self}", self.kind());
        }

        let mut response = (status, Json(self.response())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Maps a unique violation to [`ApiError::AlreadyExists`], naming the property whose
/// constraint failed. `fallback` is reported when the constraint isn't recognized.
pub fn map_unique_violation<T>(result: QueryResult<T>, fallback: ResourceProperty) -> ApiResult<T> {
    use diesel::result::DatabaseErrorKind;
    use diesel::result::Error as DieselError;

    match result {
        Ok(value) => Ok(value),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
            let property = info
                .constraint_name()
                .and_then(ResourceProperty::from_constraint)
                .unwrap_or(fallback);
            Err(ApiError::AlreadyExists(property))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn map_foreign_key_violation<T>(result: QueryResult<T>, resource: ResourceType) -> ApiResult<T> {
    use diesel::result::DatabaseErrorKind;
    use diesel::result::Error as DieselError;

    match result {
        Ok(value) => Ok(value),
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(ApiError::NotFound(resource)),
        Err(err) => Err(err.into()),
    }
}

/// Body of every error response.
#[derive(Serialize)]
struct ErrorResponse {
    /// Human readable description of what went wrong.
    detail: String,
    /// Name of the error, e.g. `ClientNotFound`.
    name: &'static str,
    /// Generic title of the error, e.g. `Resource Not Found`.
    title: &'static str,
}

fn join_roles(roles: &[Rol]) -> String {
    roles.iter().map(Rol::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_body() {
        let response = ApiError::NotFound(ResourceType::Cliente).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());

        let body = body_of(response).await;
        assert_eq!(body["detail"], "Cliente no encontrado");
        assert_eq!(body["name"], "ClientNotFound");
        assert_eq!(body["title"], "Resource Not Found");
    }

    #[tokio::test]
    async fn unauthorized_has_challenge() {
        let response = ApiError::from(AuthenticationError::UnknownUser).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");
        let body = body_of(response).await;
        assert_eq!(body["detail"], "No se pudo validar las credenciales");

        let inactive = ApiError::from(AuthenticationError::InactiveUser).into_response();
        assert_eq!(inactive.status(), StatusCode::FORBIDDEN);
        assert!(inactive.headers().get(WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn messages() {
        const ROLES: &[Rol] = &[Rol::Admin, Rol::Recepcion];
        assert_eq!(ApiError::MissingRole(ROLES).to_string(), "Se requiere rol: ADMIN, RECEPCION");
        assert_eq!(
            ApiError::InsufficientVacationDays(Decimal::new(250, 2)).to_string(),
            "No tienes suficientes días disponibles. Disponibles: 2.50"
        );
        assert_eq!(
            ApiError::AlreadyExists(ResourceProperty::ClienteRfc).to_string(),
            "Ya existe un cliente con este RFC"
        );
        assert_eq!(ApiError::AlreadyExists(ResourceProperty::Username).status_code(), StatusCode::BAD_REQUEST);
    }

    struct ConstraintViolation(Option<&'static str>);

    impl diesel::result::DatabaseErrorInformation for ConstraintViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.0
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn unique_violation(constraint: Option<&'static str>) -> QueryResult<()> {
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new(ConstraintViolation(constraint)),
        ))
    }

    #[test]
    fn unique_violation_mapping() {
        let result: QueryResult<()> = Err(diesel::result::Error::NotFound);
        let err = map_unique_violation(result, ResourceProperty::Folio).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let email = map_unique_violation(unique_violation(Some("cliente_email_key")), ResourceProperty::ClienteRfc);
        assert!(matches!(email, Err(ApiError::AlreadyExists(ResourceProperty::ClienteEmail))));
        let codigo = map_unique_violation(unique_violation(Some("usuario_codigo_key")), ResourceProperty::UserEmail);
        assert!(matches!(codigo, Err(ApiError::AlreadyExists(ResourceProperty::UserCodigo))));
        let unknown = map_unique_violation(unique_violation(None), ResourceProperty::Username);
        assert!(matches!(unknown, Err(ApiError::AlreadyExists(ResourceProperty::Username))));
    }
}
