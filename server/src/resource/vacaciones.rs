use crate::model::enums::{EstadoSolicitud, TipoSolicitud};
use crate::model::user::User;
use crate::model::vacaciones::Solicitud;
use crate::resource::{self, name_of};
use crate::time::DateTime;
use crate::workshop::vacation::{self, Balance};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use time::Date;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SolicitudInfo {
    id: i64,
    empleado_id: i64,
    empleado_nombre: Option<String>,
    fecha_solicitud: DateTime,
    fecha_inicio: Date,
    fecha_fin: Date,
    tipo: TipoSolicitud,
    cantidad: Decimal,
    /// Vacation days the request consumes once approved.
    dias_equivalentes: Decimal,
    estado: EstadoSolicitud,
    aprobada_por_id: Option<i64>,
    aprobada_por_nombre: Option<String>,
    fecha_aprobacion: Option<DateTime>,
    observaciones: Option<String>,
    motivo_rechazo: Option<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl SolicitudInfo {
    pub fn new(conn: &mut PgConnection, solicitud: Solicitud) -> QueryResult<Self> {
        let names = resource::user_names(conn, [Some(solicitud.empleado_id), solicitud.aprobada_por_id].into_iter().flatten())?;
        Ok(Self::build(solicitud, &names))
    }

    pub fn new_batch(conn: &mut PgConnection, solicitudes: Vec<Solicitud>) -> QueryResult<Vec<Self>> {
        let user_ids = solicitudes
            .iter()
            .flat_map(|solicitud| [Some(solicitud.empleado_id), solicitud.aprobada_por_id])
            .flatten();
        let names = resource::user_names(conn, user_ids)?;
        Ok(solicitudes
            .into_iter()
            .map(|solicitud| Self::build(solicitud, &names))
            .collect())
    }

    fn build(solicitud: Solicitud, names: &HashMap<i64, String>) -> Self {
        Self {
            empleado_nombre: name_of(names, Some(solicitud.empleado_id)),
            aprobada_por_nombre: name_of(names, solicitud.aprobada_por_id),
            dias_equivalentes: vacation::day_equivalent(solicitud.tipo, solicitud.cantidad),
            id: solicitud.id,
            empleado_id: solicitud.empleado_id,
            fecha_solicitud: solicitud.fecha_solicitud,
            fecha_inicio: solicitud.fecha_inicio,
            fecha_fin: solicitud.fecha_fin,
            tipo: solicitud.tipo,
            cantidad: solicitud.cantidad,
            estado: solicitud.estado,
            aprobada_por_id: solicitud.aprobada_por_id,
            fecha_aprobacion: solicitud.fecha_aprobacion,
            observaciones: solicitud.observaciones,
            motivo_rechazo: solicitud.motivo_rechazo,
            created_at: solicitud.created_at,
            updated_at: solicitud.updated_at,
        }
    }
}

/// Vacation balance of an employee for the current service year.
#[derive(Debug, Serialize, ToSchema)]
pub struct VacationSummary {
    empleado_id: i64,
    nombre_completo: String,
    fecha_ingreso: Option<Date>,
    anios_servicio: i32,
    /// First day of the current service year.
    inicio_periodo: Date,
    dias_vacaciones_anio: Decimal,
    dias_vacaciones_disponibles: Decimal,
    dias_vacaciones_tomados: Decimal,
    dias_vacaciones_pendientes_anios_anteriores: Decimal,
}

impl VacationSummary {
    pub fn new(empleado: &User, balance: Balance) -> Self {
        Self {
            empleado_id: empleado.id,
            nombre_completo: empleado.nombre_completo.clone(),
            fecha_ingreso: empleado.fecha_ingreso,
            anios_servicio: balance.years_of_service,
            inicio_periodo: balance.service_year_start,
            dias_vacaciones_anio: balance.granted,
            dias_vacaciones_disponibles: balance.available,
            dias_vacaciones_tomados: balance.taken,
            dias_vacaciones_pendientes_anios_anteriores: balance.carried_over,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::enums::Rol;
    use crate::test::sample_user;
    use time::macros::date;

    #[test]
    fn summary_fields() {
        let mut empleado = sample_user(Rol::Tecnico);
        empleado.dias_vacaciones_pendientes = Decimal::from(3);
        let today = date!(2025 - 03 - 01);
        let balance = vacation::balance(empleado.fecha_ingreso, empleado.dias_vacaciones_pendientes, &[], today).unwrap();

        let json = serde_json::to_value(VacationSummary::new(&empleado, balance)).unwrap();
        assert_eq!(json["anios_servicio"], 5);
        assert_eq!(json["inicio_periodo"], "2025-01-15");
        assert_eq!(json["dias_vacaciones_anio"], "20");
        assert_eq!(json["dias_vacaciones_pendientes_anios_anteriores"], "3");
        assert_eq!(json["dias_vacaciones_disponibles"], "23");
        assert_eq!(json["dias_vacaciones_tomados"], "0");
    }
}
