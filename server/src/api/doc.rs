use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

pub const AUTH_TAG: &str = "Auth";
pub const CLIENTE_TAG: &str = "Cliente";
pub const INCIDENCIA_TAG: &str = "Incidencia";
pub const INFO_TAG: &str = "Info";
pub const ORDEN_TAG: &str = "Orden";
pub const SUCURSAL_TAG: &str = "Sucursal";
pub const USER_TAG: &str = "User";
pub const VACACIONES_TAG: &str = "Vacaciones";

#[derive(OpenApi)]
#[openapi(
    info(title = "CRM Talleres", description = "REST backend of the CRM Talleres workshop application"),
    modifiers(&BearerAuth),
    tags(
        (name = AUTH_TAG, description = "Login, registration and the current user"),
        (name = CLIENTE_TAG, description = "Client API endpoints"),
        (name = INCIDENCIA_TAG, description = "Employee incident API endpoints"),
        (name = INFO_TAG, description = "Info API endpoints"),
        (name = ORDEN_TAG, description = "Work orders, categories and subtasks"),
        (name = SUCURSAL_TAG, description = "Client branch API endpoints"),
        (name = USER_TAG, description = "User API endpoints"),
        (name = VACACIONES_TAG, description = "Vacation request API endpoints"),
        (name = "Errors", description = ERROR_DESCRIPTION),
    )
)]
pub struct ApiDoc;

const ERROR_DESCRIPTION: &str = r#"
Failed requests answer with a non-2xx status and a JSON body:

```json5
{
    "detail": <message>, // Human readable description, shown to the user as is
    "name":   <name>,    // Name of the error, e.g. "ClientNotFound"
    "title":  <title>    // Generic title of the error, e.g. "Resource Not Found"
}
```

Every `401` carries a `WWW-Authenticate: Bearer` header. Clients should discard
their token and ask the user to log in again.
"#;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}
