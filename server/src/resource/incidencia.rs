use crate::model::enums::{Severidad, TipoIncidencia};
use crate::model::incidencia::Incidencia;
use crate::model::user::User;
use crate::resource::{self, name_of};
use crate::time::DateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use time::Date;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct IncidenciaInfo {
    id: i64,
    empleado_id: i64,
    empleado_nombre: Option<String>,
    fecha_incidencia: Date,
    tipo: TipoIncidencia,
    severidad: Severidad,
    titulo: String,
    descripcion: String,
    consecuencias: Option<String>,
    documento_url: Option<String>,
    registrado_por_id: Option<i64>,
    registrado_por_nombre: Option<String>,
    fecha_registro: DateTime,
    requiere_seguimiento: bool,
    fecha_seguimiento: Option<Date>,
    seguimiento_completado: bool,
    notas_seguimiento: Option<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl IncidenciaInfo {
    pub fn new(conn: &mut PgConnection, incidencia: Incidencia) -> QueryResult<Self> {
        let names = resource::user_names(conn, [Some(incidencia.empleado_id), incidencia.registrado_por_id].into_iter().flatten())?;
        Ok(Self::build(incidencia, &names))
    }

    pub fn new_batch(conn: &mut PgConnection, incidencias: Vec<Incidencia>) -> QueryResult<Vec<Self>> {
        let user_ids = incidencias
            .iter()
            .flat_map(|incidencia| [Some(incidencia.empleado_id), incidencia.registrado_por_id])
            .flatten();
        let names = resource::user_names(conn, user_ids)?;
        Ok(incidencias
            .into_iter()
            .map(|incidencia| Self::build(incidencia, &names))
            .collect())
    }

    fn build(incidencia: Incidencia, names: &HashMap<i64, String>) -> Self {
        Self {
            empleado_nombre: name_of(names, Some(incidencia.empleado_id)),
            registrado_por_nombre: name_of(names, incidencia.registrado_por_id),
            id: incidencia.id,
            empleado_id: incidencia.empleado_id,
            fecha_incidencia: incidencia.fecha_incidencia,
            tipo: incidencia.tipo,
            severidad: incidencia.severidad,
            titulo: incidencia.titulo,
            descripcion: incidencia.descripcion,
            consecuencias: incidencia.consecuencias,
            documento_url: incidencia.documento_url,
            registrado_por_id: incidencia.registrado_por_id,
            fecha_registro: incidencia.fecha_registro,
            requiere_seguimiento: incidencia.requiere_seguimiento,
            fecha_seguimiento: incidencia.fecha_seguimiento,
            seguimiento_completado: incidencia.seguimiento_completado,
            notas_seguimiento: incidencia.notas_seguimiento,
            created_at: incidencia.created_at,
            updated_at: incidencia.updated_at,
        }
    }
}

/// Number of incidents of an employee, broken down by type and severity.
/// Types and severities without incidents are left out.
#[derive(Debug, Serialize, ToSchema)]
pub struct IncidenciaStats {
    empleado_id: i64,
    nombre_completo: String,
    total_incidencias: i64,
    por_tipo: BTreeMap<TipoIncidencia, i64>,
    por_severidad: BTreeMap<Severidad, i64>,
}

impl IncidenciaStats {
    pub fn new(empleado: &User, incidencias: impl IntoIterator<Item = (TipoIncidencia, Severidad)>) -> Self {
        let mut stats = Self {
            empleado_id: empleado.id,
            nombre_completo: empleado.nombre_completo.clone(),
            total_incidencias: 0,
            por_tipo: BTreeMap::new(),
            por_severidad: BTreeMap::new(),
        };
        for (tipo, severidad) in incidencias {
            stats.total_incidencias += 1;
            *stats.por_tipo.entry(tipo).or_default() += 1;
            *stats.por_severidad.entry(severidad).or_default() += 1;
        }
        stats
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::enums::Rol;
    use crate::test::sample_user;
    use serde_json::json;

    #[test]
    fn stats_counts() {
        let empleado = sample_user(Rol::Tecnico);
        let stats = IncidenciaStats::new(
            &empleado,
            [
                (TipoIncidencia::Retardo, Severidad::Leve),
                (TipoIncidencia::Retardo, Severidad::Moderada),
                (TipoIncidencia::Bono, Severidad::Positiva),
            ],
        );

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["empleado_id"], empleado.id);
        assert_eq!(json["total_incidencias"], 3);
        assert_eq!(json["por_tipo"], json!({"RETARDO": 2, "BONO": 1}));
        assert_eq!(json["por_severidad"], json!({"LEVE": 1, "MODERADA": 1, "POSITIVA": 1}));

        let json = serde_json::to_value(IncidenciaStats::new(&empleado, Vec::new())).unwrap();
        assert_eq!(json["total_incidencias"], 0);
        assert_eq!(json["por_tipo"], json!({}));
    }
}
