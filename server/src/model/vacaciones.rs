use crate::model::enums::{EstadoSolicitud, TipoSolicitud};
use crate::schema::solicitud_vacaciones;
use crate::time::DateTime;
use crate::workshop::vacation::RequestSummary;
use diesel::pg::Pg;
use diesel::prelude::*;
use rust_decimal::Decimal;
use time::Date;

#[derive(Insertable)]
#[diesel(table_name = solicitud_vacaciones)]
#[diesel(check_for_backend(Pg))]
pub struct NewSolicitud<'a> {
    pub empleado_id: i64,
    pub fecha_inicio: Date,
    pub fecha_fin: Date,
    pub tipo: TipoSolicitud,
    pub cantidad: Decimal,
    pub estado: EstadoSolicitud,
    pub observaciones: Option<&'a str>,
}

/// A vacation request made by an employee.
#[derive(Clone, AsChangeset, Identifiable, Queryable, Selectable)]
#[diesel(treat_none_as_null = true)]
#[diesel(table_name = solicitud_vacaciones)]
#[diesel(check_for_backend(Pg))]
pub struct Solicitud {
    pub id: i64,
    pub empleado_id: i64,
    pub fecha_solicitud: DateTime,
    pub fecha_inicio: Date,
    pub fecha_fin: Date,
    pub tipo: TipoSolicitud,
    pub cantidad: Decimal,
    pub estado: EstadoSolicitud,
    pub aprobada_por_id: Option<i64>,
    pub fecha_aprobacion: Option<DateTime>,
    pub observaciones: Option<String>,
    pub motivo_rechazo: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Solicitud {
    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            fecha_inicio: self.fecha_inicio,
            tipo: self.tipo,
            cantidad: self.cantidad,
            estado: self.estado,
        }
    }
}
