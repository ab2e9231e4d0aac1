use crate::model::enums::Rol;
use crate::model::user::User;
use crate::time::DateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;
use utoipa::ToSchema;

/// A user as shown to clients. Never includes the password hash.
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    id: i64,
    username: String,
    email: String,
    nombre_completo: String,
    rol: Rol,
    activo: bool,
    /// Four digit login code of technicians.
    codigo: Option<String>,
    fecha_ingreso: Option<Date>,
    /// Vacation days carried over from previous years.
    dias_vacaciones_pendientes: Decimal,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            nombre_completo: user.nombre_completo,
            rol: user.rol,
            activo: user.activo,
            codigo: user.codigo,
            fecha_ingreso: user.fecha_ingreso,
            dias_vacaciones_pendientes: user.dias_vacaciones_pendientes,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::sample_user;

    #[test]
    fn password_hash_is_hidden() {
        let mut user = sample_user(Rol::Tecnico);
        user.password_hash = String::from("$argon2id$v=19$secret");
        user.codigo = Some(String::from("0427"));

        let json = serde_json::to_value(UserInfo::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["rol"], "TECNICO");
        assert_eq!(json["codigo"], "0427");
        assert_eq!(json["fecha_ingreso"], "2020-01-15");
    }
}
