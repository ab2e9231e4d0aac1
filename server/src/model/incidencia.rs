use crate::model::enums::{Severidad, TipoIncidencia};
use crate::schema::incidencia_empleado;
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use time::Date;

#[derive(Insertable)]
#[diesel(table_name = incidencia_empleado)]
#[diesel(check_for_backend(Pg))]
pub struct NewIncidencia<'a> {
    pub empleado_id: i64,
    pub fecha_incidencia: Date,
    pub tipo: TipoIncidencia,
    pub severidad: Severidad,
    pub titulo: &'a str,
    pub descripcion: &'a str,
    pub consecuencias: Option<&'a str>,
    pub registrado_por_id: Option<i64>,
    pub requiere_seguimiento: bool,
    pub fecha_seguimiento: Option<Date>,
}

/// A disciplinary or positive event recorded on an employee's file.
#[derive(Clone, AsChangeset, Identifiable, Queryable, Selectable)]
#[diesel(treat_none_as_null = true)]
#[diesel(table_name = incidencia_empleado)]
#[diesel(check_for_backend(Pg))]
pub struct Incidencia {
    pub id: i64,
    pub empleado_id: i64,
    pub fecha_incidencia: Date,
    pub tipo: TipoIncidencia,
    pub severidad: Severidad,
    pub titulo: String,
    pub descripcion: String,
    pub consecuencias: Option<String>,
    pub documento_url: Option<String>,
    pub registrado_por_id: Option<i64>,
    pub fecha_registro: DateTime,
    pub requiere_seguimiento: bool,
    pub fecha_seguimiento: Option<Date>,
    pub seguimiento_completado: bool,
    pub notas_seguimiento: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
