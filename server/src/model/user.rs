use crate::model::enums::Rol;
use crate::schema::usuario;
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use rust_decimal::Decimal;
use time::Date;

#[derive(Insertable)]
#[diesel(table_name = usuario)]
#[diesel(check_for_backend(Pg))]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub nombre_completo: &'a str,
    pub password_hash: &'a str,
    pub rol: Rol,
    pub activo: bool,
    pub codigo: Option<&'a str>,
    pub fecha_ingreso: Option<Date>,
    pub dias_vacaciones_pendientes: Decimal,
}

#[derive(Clone, AsChangeset, Identifiable, Queryable, Selectable)]
#[diesel(treat_none_as_null = true)]
#[diesel(table_name = usuario)]
#[diesel(check_for_backend(Pg))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub nombre_completo: String,
    pub password_hash: String,
    pub rol: Rol,
    pub activo: bool,
    pub codigo: Option<String>,
    pub fecha_ingreso: Option<Date>,
    pub dias_vacaciones_pendientes: Decimal,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
