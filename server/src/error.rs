/// Short machine-readable name of an error, sent as the `name` field of error responses.
pub trait ErrorKind {
    fn kind(&self) -> &'static str;
}

impl ErrorKind for std::env::VarError {
    fn kind(&self) -> &'static str {
        match self {
            Self::NotPresent => "EnvironmentVariableNotPresent",
            Self::NotUnicode(_) => "EnvironmentVariableNotUnicode",
        }
    }
}

impl ErrorKind for argon2::password_hash::errors::B64Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEncoding => "InvalidEncoding",
            Self::InvalidLength => "InvalidLength",
        }
    }
}

impl ErrorKind for argon2::password_hash::errors::InvalidValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidChar(_) => "InvalidChar",
            Self::InvalidFormat => "InvalidFormat",
            Self::Malformed => "MalformedValue",
            Self::TooLong => "ValueTooLong",
            Self::TooShort => "ValueTooShort",
            _ => "UnknownArgonInvalidValue",
        }
    }
}

impl ErrorKind for argon2::password_hash::Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::Algorithm => "UnsupportedAlgorithm",
            Self::B64Encoding(err) => err.kind(),
            Self::Crypto => "CryptoError",
            Self::OutputSize { .. } => "UnexpectedOutputSize",
            Self::ParamNameDuplicated => "ParamNameDuplicated",
            Self::ParamNameInvalid => "ParamNameInvalid",
            Self::ParamValueInvalid(err) => err.kind(),
            Self::ParamsMaxExceeded => "ParamsMaxExceeded",
            Self::Password => "InvalidPassword",
            Self::PhcStringField => "InvalidPhcStringField",
            Self::PhcStringTrailingData => "PhcStringTrailingData",
            Self::SaltInvalid(err) => err.kind(),
            Self::Version => "InvalidVersion",
            _ => "UnknownArgonError",
        }
    }
}

impl ErrorKind for diesel::result::DatabaseErrorKind {
    fn kind(&self) -> &'static str {
        match self {
            Self::CheckViolation => "CheckViolation",
            Self::ClosedConnection => "ClosedConnection",
            Self::ForeignKeyViolation => "ForeignKeyViolation",
            Self::NotNullViolation => "NotNullViolation",
            Self::ReadOnlyTransaction => "ReadOnlyTransaction",
            Self::SerializationFailure => "SerializationFailure",
            Self::UnableToSendCommand => "UnableToSendCommand",
            Self::UniqueViolation => "UniqueViolation",
            _ => "UnknownDatabaseError",
        }
    }
}

impl ErrorKind for diesel::result::Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyInTransaction => "AlreadyInTransaction",
            Self::BrokenTransactionManager => "BrokenTransactionManager",
            Self::DatabaseError(err, _) => err.kind(),
            Self::DeserializationError(_) => "DeserializationError",
            Self::InvalidCString(_) => "InvalidCString",
            Self::NotFound => "RowNotFound",
            Self::NotInTransaction => "NotInTransaction",
            Self::QueryBuilderError(_) => "QueryBuilderError",
            Self::RollbackErrorOnCommit { rollback_error, .. } => rollback_error.kind(),
            Self::RollbackTransaction => "RollbackTransaction",
            Self::SerializationError(_) => "SerializationError",
            _ => "UnknownQueryError",
        }
    }
}

impl ErrorKind for diesel::r2d2::PoolError {
    fn kind(&self) -> &'static str {
        "FailedConnection"
    }
}

impl ErrorKind for base64::DecodeError {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidByte(..) => "InvalidByte",
            Self::InvalidLastSymbol(..) => "InvalidLastSymbol",
            Self::InvalidLength(_) => "InvalidLength",
            Self::InvalidPadding => "InvalidPadding",
        }
    }
}

impl ErrorKind for crate::auth::token::TokenError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Encoding(err) => err.kind(),
            Self::Expired => "ExpiredToken",
            Self::InvalidKey(_) => "InvalidTokenKey",
            Self::InvalidSignature => "InvalidTokenSignature",
            Self::Json(_) => "MalformedToken",
            Self::Malformed => "MalformedToken",
            Self::UnsupportedAlgorithm => "UnsupportedTokenAlgorithm",
        }
    }
}

impl ErrorKind for crate::auth::header::AuthenticationError {
    fn kind(&self) -> &'static str {
        match self {
            Self::FailedConnection(err) => err.kind(),
            Self::FailedQuery(err) => err.kind(),
            Self::InactiveUser => "InactiveUser",
            Self::InvalidAuthType => "InvalidAuthType",
            Self::InvalidTechnicianCode => "InvalidTechnicianCode",
            Self::InvalidToken(err) => err.kind(),
            Self::MissingCredentials => "MissingCredentials",
            Self::UnknownUser => "UnknownUser",
            Self::UsernamePasswordMismatch => "UsernamePasswordMismatch",
        }
    }
}

impl ErrorKind for std::io::ErrorKind {
    fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "FileAlreadyExists",
            Self::InvalidData => "InvalidData",
            Self::InvalidInput => "InvalidInput",
            Self::NotFound => "FileNotFound",
            Self::PermissionDenied => "PermissionDenied",
            Self::StorageFull => "StorageFull",
            Self::UnexpectedEof => "UnexpectedEof",
            Self::WriteZero => "WriteZero",
            _ => "UnknownIOError",
        }
    }
}

impl ErrorKind for std::io::Error {
    fn kind(&self) -> &'static str {
        ErrorKind::kind(&std::io::Error::kind(self))
    }
}

impl ErrorKind for axum::extract::rejection::JsonRejection {
    fn kind(&self) -> &'static str {
        match self {
            Self::JsonDataError(_) => "JsonDataError",
            Self::JsonSyntaxError(_) => "JsonSyntaxError",
            Self::MissingJsonContentType(_) => "MissingJsonContentType",
            Self::BytesRejection(_) => "BytesRejection",
            _ => "UnknownJsonRejection",
        }
    }
}

impl ErrorKind for axum::extract::rejection::FormRejection {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFormContentType(_) => "InvalidFormContentType",
            Self::FailedToDeserializeForm(_) => "FailedToDeserializeForm",
            Self::FailedToDeserializeFormBody(_) => "FailedToDeserializeFormBody",
            Self::BytesRejection(_) => "BytesRejection",
            _ => "UnknownFormRejection",
        }
    }
}

impl ErrorKind for axum::extract::rejection::PathRejection {
    fn kind(&self) -> &'static str {
        match self {
            Self::FailedToDeserializePathParams(_) => "PathDeserializeError",
            Self::MissingPathParams(_) => "MissingPathParams",
            _ => "UnknownPathRejection",
        }
    }
}

impl ErrorKind for axum::extract::rejection::QueryRejection {
    fn kind(&self) -> &'static str {
        match self {
            Self::FailedToDeserializeQueryString(_) => "FailedToDeserializeQueryString",
            _ => "UnknownQueryRejection",
        }
    }
}

impl ErrorKind for axum::extract::multipart::MultipartRejection {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidBoundary(_) => "InvalidBoundary",
            _ => "UnknownMultipartRejection",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::header::AuthenticationError;
    use crate::auth::token::TokenError;

    #[test]
    fn nested_kinds() {
        let err = AuthenticationError::InvalidToken(TokenError::Expired);
        assert_eq!(err.kind(), "ExpiredToken");
        assert_eq!(AuthenticationError::UnknownUser.kind(), "UnknownUser");
        assert_eq!(diesel::result::Error::NotFound.kind(), "RowNotFound");

        let io_error = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(ErrorKind::kind(&io_error), "PermissionDenied");
    }
}
