use crate::model::enums::TipoCliente;
use crate::schema::cliente;
use crate::time::DateTime;
use crate::workshop::address::{self, Address};
use diesel::pg::Pg;
use diesel::prelude::*;
use time::Date;

#[derive(Insertable)]
#[diesel(table_name = cliente)]
#[diesel(check_for_backend(Pg))]
pub struct NewCliente<'a> {
    pub tipo_cliente: TipoCliente,
    pub nombre: &'a str,
    pub apellido_paterno: Option<&'a str>,
    pub apellido_materno: Option<&'a str>,
    pub razon_social: Option<&'a str>,
    pub rfc: Option<&'a str>,
    pub email: Option<&'a str>,
    pub telefono: &'a str,
    pub telefono_alternativo: Option<&'a str>,
    pub calle: Option<&'a str>,
    pub numero_exterior: Option<&'a str>,
    pub numero_interior: Option<&'a str>,
    pub colonia: Option<&'a str>,
    pub codigo_postal: Option<&'a str>,
    pub ciudad: Option<&'a str>,
    pub estado: Option<&'a str>,
    pub fecha_nacimiento: Option<Date>,
    pub notas: Option<&'a str>,
    pub preferencias: Option<&'a str>,
}

#[derive(Clone, AsChangeset, Identifiable, Queryable, Selectable)]
#[diesel(treat_none_as_null = true)]
#[diesel(table_name = cliente)]
#[diesel(check_for_backend(Pg))]
pub struct Cliente {
    pub id: i64,
    pub tipo_cliente: TipoCliente,
    pub nombre: String,
    pub apellido_paterno: Option<String>,
    pub apellido_materno: Option<String>,
    pub razon_social: Option<String>,
    pub rfc: Option<String>,
    pub email: Option<String>,
    pub telefono: String,
    pub telefono_alternativo: Option<String>,
    pub calle: Option<String>,
    pub numero_exterior: Option<String>,
    pub numero_interior: Option<String>,
    pub colonia: Option<String>,
    pub codigo_postal: Option<String>,
    pub ciudad: Option<String>,
    pub estado: Option<String>,
    pub fecha_nacimiento: Option<Date>,
    pub notas: Option<String>,
    pub preferencias: Option<String>,
    pub activo: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Cliente {
    pub fn nombre_completo(&self) -> String {
        address::client_name(
            self.tipo_cliente,
            &self.nombre,
            self.apellido_paterno.as_deref(),
            self.apellido_materno.as_deref(),
            self.razon_social.as_deref(),
        )
    }

    pub fn address(&self) -> Address<'_> {
        Address {
            calle: self.calle.as_deref(),
            numero_exterior: self.numero_exterior.as_deref(),
            numero_interior: self.numero_interior.as_deref(),
            colonia: self.colonia.as_deref(),
            codigo_postal: self.codigo_postal.as_deref(),
            ciudad: self.ciudad.as_deref(),
            estado: self.estado.as_deref(),
        }
    }
}
