use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::SmallInt;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};
use thiserror::Error;
use utoipa::ToSchema;

/// In general, the order of these enums should not be changed.
/// They are encoded in the database as an integer, so changing
/// the underlying representation of an enum changes its meaning.
///
/// New enum variants should therefore always be appended at the end.

#[derive(Debug, Error)]
#[error("Failed to deserialize {name} from value {value}")]
pub struct DeserializeEnumError {
    name: &'static str,
    value: i16,
}

/// Implements SmallInt conversions for an enum with an `i16` representation.
macro_rules! small_int_sql {
    ($enum_type:ident, $name:literal) => {
        impl ToSql<SmallInt, Pg> for $enum_type
        where
            i16: ToSql<SmallInt, Pg>,
        {
            fn to_sql(&self, out: &mut Output<Pg>) -> serialize::Result {
                let value = *self as i16;
                <i16 as ToSql<SmallInt, Pg>>::to_sql(&value, &mut out.reborrow())
            }
        }

        impl FromSql<SmallInt, Pg> for $enum_type
        where
            i16: FromSql<SmallInt, Pg>,
        {
            fn from_sql(bytes: <Pg as diesel::backend::Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let value = i16::from_sql(bytes)?;
                $enum_type::from_repr(value).ok_or_else(|| DeserializeEnumError { name: $name, value }.into())
            }
        }
    };
}

#[derive(
    Debug,
    Display,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    FromRepr,
    IntoStaticStr,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum Rol {
    Admin,
    Tecnico,
    Recepcion,
    Caja,
    Auxiliar,
    JefeTaller,
}

small_int_sql!(Rol, "rol");

#[derive(
    Debug, Display, Default, Copy, Clone, PartialEq, Eq, FromRepr, AsExpression, FromSqlRow, Serialize, Deserialize, ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TipoCliente {
    #[default]
    PersonaFisica,
    PersonaMoral,
}

small_int_sql!(TipoCliente, "tipo de cliente");

/// Lifecycle status of a work order.
#[derive(
    Debug,
    Display,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    FromRepr,
    IntoStaticStr,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum EstadoOrden {
    #[default]
    Recibido,
    Diagnostico,
    EnEspera,
    Proceso,
    Pausa,
    Revision,
    Terminado,
    Entregado,
    Finalizado,
}

impl EstadoOrden {
    /// Orders in these states are closed and can no longer run late.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Entregado | Self::Finalizado)
    }
}

small_int_sql!(EstadoOrden, "estado de orden");

#[derive(
    Debug, Display, Default, Copy, Clone, PartialEq, Eq, FromRepr, AsExpression, FromSqlRow, Serialize, Deserialize, ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum Prioridad {
    #[default]
    Normal,
    Urgente,
}

small_int_sql!(Prioridad, "prioridad");

/// Kind of document authorizing a work order.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, FromRepr, AsExpression, FromSqlRow, Serialize, Deserialize, ToSchema)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TipoPermiso {
    Cotizacion,
    OrdenCompra,
    Requisicion,
    ServicioDirecto,
}

small_int_sql!(TipoPermiso, "tipo de permiso");

#[derive(
    Debug, Display, Default, Copy, Clone, PartialEq, Eq, FromRepr, AsExpression, FromSqlRow, Serialize, Deserialize, ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum EstadoSubtarea {
    #[default]
    Pendiente,
    EnProceso,
    Completada,
    Cancelada,
}

small_int_sql!(EstadoSubtarea, "estado de subtarea");

#[derive(
    Debug, Display, Default, Copy, Clone, PartialEq, Eq, FromRepr, AsExpression, FromSqlRow, Serialize, Deserialize, ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TipoSolicitud {
    #[default]
    DiasCompletos,
    MedioDia,
    Horas,
}

small_int_sql!(TipoSolicitud, "tipo de solicitud");

#[derive(
    Debug, Display, Default, Copy, Clone, PartialEq, Eq, FromRepr, AsExpression, FromSqlRow, Serialize, Deserialize, ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum EstadoSolicitud {
    #[default]
    Pendiente,
    Aprobada,
    Rechazada,
    Tomada,
    Cancelada,
}

impl EstadoSolicitud {
    /// Requests in these states consume vacation days.
    pub fn consumes_days(self) -> bool {
        matches!(self, Self::Aprobada | Self::Tomada)
    }
}

small_int_sql!(EstadoSolicitud, "estado de solicitud");

#[derive(
    Debug,
    Display,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    FromRepr,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TipoIncidencia {
    Retardo,
    FaltaInjustificada,
    LlamadaAtencion,
    Sancion,
    Suspension,
    Reconocimiento,
    Bono,
    Aumento,
    Promocion,
    Capacitacion,
    AccidenteTrabajo,
    Otro,
}

small_int_sql!(TipoIncidencia, "tipo de incidencia");

#[derive(
    Debug,
    Display,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    FromRepr,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum Severidad {
    #[default]
    Leve,
    Moderada,
    Grave,
    MuyGrave,
    /// Recognitions, bonuses and other favorable records.
    Positiva,
}

small_int_sql!(Severidad, "severidad");

/// Kinds of records served by the API. Used in error messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum ResourceType {
    #[strum(serialize = "Categoría")]
    Categoria,
    #[strum(serialize = "Cliente")]
    Cliente,
    #[strum(serialize = "Empleado")]
    Empleado,
    #[strum(serialize = "Incidencia")]
    Incidencia,
    #[strum(serialize = "Orden de trabajo")]
    Orden,
    #[strum(serialize = "Solicitud")]
    Solicitud,
    #[strum(serialize = "Subcategoría")]
    Subcategoria,
    #[strum(serialize = "Subtarea")]
    Subtarea,
    #[strum(serialize = "Sucursal")]
    Sucursal,
    #[strum(serialize = "Técnico")]
    Tecnico,
    #[strum(serialize = "Usuario")]
    Usuario,
}

impl ResourceType {
    pub fn not_found_message(self) -> String {
        match self {
            Self::Cliente | Self::Empleado | Self::Tecnico | Self::Usuario => format!("{self} no encontrado"),
            _ => format!("{self} no encontrada"),
        }
    }
}

/// Unique properties of records. Used in error messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResourceProperty {
    CategoriaNombre,
    ClienteEmail,
    ClienteRfc,
    Folio,
    UserCodigo,
    UserEmail,
    Username,
}

impl ResourceProperty {
    pub fn already_exists_message(self) -> &'static str {
        match self {
            Self::CategoriaNombre => "Ya existe una categoría con este nombre",
            Self::ClienteEmail => "Ya existe un cliente con este email",
            Self::ClienteRfc => "Ya existe un cliente con este RFC",
            Self::Folio => "El folio ya está en uso",
            Self::UserCodigo => "El código ya está asignado a otro usuario",
            Self::UserEmail => "El email ya está registrado",
            Self::Username => "El nombre de usuario ya está registrado",
        }
    }

    /// Property guarded by the unique constraint named `constraint`.
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "categoria_orden_nombre_key" => Some(Self::CategoriaNombre),
            "cliente_email_key" => Some(Self::ClienteEmail),
            "cliente_rfc_key" => Some(Self::ClienteRfc),
            "orden_trabajo_folio_key" => Some(Self::Folio),
            "usuario_codigo_key" => Some(Self::UserCodigo),
            "usuario_email_key" => Some(Self::UserEmail),
            "usuario_username_key" => Some(Self::Username),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn serialized_names() {
        assert_eq!(serde_json::to_string(&Rol::JefeTaller).unwrap(), "\"JEFE_TALLER\"");
        assert_eq!(serde_json::to_string(&EstadoOrden::EnEspera).unwrap(), "\"EN_ESPERA\"");
        assert_eq!(serde_json::to_string(&TipoCliente::PersonaMoral).unwrap(), "\"PERSONA_MORAL\"");
        assert_eq!(serde_json::to_string(&TipoPermiso::OrdenCompra).unwrap(), "\"ORDEN_COMPRA\"");
        assert_eq!(serde_json::from_str::<TipoSolicitud>("\"MEDIO_DIA\"").unwrap(), TipoSolicitud::MedioDia);
        assert!(serde_json::from_str::<Rol>("\"admin\"").is_err());
    }

    #[test]
    fn strum_names_match_serde() {
        for estado in EstadoOrden::iter() {
            let json = serde_json::to_string(&estado).unwrap();
            assert_eq!(json.trim_matches('"'), estado.to_string());
            assert_eq!(EstadoOrden::from_str(&estado.to_string()).unwrap(), estado);
        }
        for rol in Rol::iter() {
            let name: &'static str = rol.into();
            assert_eq!(Rol::from_str(name).unwrap(), rol);
        }
        for tipo in TipoIncidencia::iter() {
            let json = serde_json::to_string(&tipo).unwrap();
            assert_eq!(json.trim_matches('"'), tipo.to_string());
        }
        for severidad in Severidad::iter() {
            let json = serde_json::to_string(&severidad).unwrap();
            assert_eq!(json.trim_matches('"'), severidad.to_string());
        }
    }

    #[test]
    fn repr_is_stable() {
        assert_eq!(Rol::Admin as i16, 0);
        assert_eq!(Rol::JefeTaller as i16, 5);
        assert_eq!(EstadoOrden::Recibido as i16, 0);
        assert_eq!(EstadoOrden::Finalizado as i16, 8);
        assert_eq!(EstadoSolicitud::from_repr(4), Some(EstadoSolicitud::Cancelada));
        assert_eq!(EstadoSolicitud::from_repr(5), None);
        assert_eq!(TipoIncidencia::AccidenteTrabajo as i16, 10);
        assert_eq!(Severidad::from_repr(4), Some(Severidad::Positiva));
    }

    #[test]
    fn messages() {
        assert_eq!(ResourceType::Cliente.not_found_message(), "Cliente no encontrado");
        assert_eq!(ResourceType::Orden.not_found_message(), "Orden de trabajo no encontrada");
        assert_eq!(ResourceType::Solicitud.not_found_message(), "Solicitud no encontrada");
        assert_eq!(ResourceType::Empleado.not_found_message(), "Empleado no encontrado");
        assert_eq!(ResourceType::Incidencia.not_found_message(), "Incidencia no encontrada");
    }
}
