use crate::model::cliente::Cliente;
use crate::schema::sucursal;
use crate::time::DateTime;
use crate::workshop::address::Address;
use diesel::pg::Pg;
use diesel::prelude::*;

#[derive(Insertable)]
#[diesel(table_name = sucursal)]
#[diesel(check_for_backend(Pg))]
pub struct NewSucursal<'a> {
    pub cliente_id: i64,
    pub nombre_sucursal: &'a str,
    pub codigo_sucursal: Option<&'a str>,
    pub telefono: Option<&'a str>,
    pub telefono_alternativo: Option<&'a str>,
    pub email: Option<&'a str>,
    pub calle: Option<&'a str>,
    pub numero_exterior: Option<&'a str>,
    pub numero_interior: Option<&'a str>,
    pub colonia: Option<&'a str>,
    pub codigo_postal: Option<&'a str>,
    pub ciudad: Option<&'a str>,
    pub estado: Option<&'a str>,
    pub notas: Option<&'a str>,
    pub activo: bool,
}

#[derive(Clone, AsChangeset, Associations, Identifiable, Queryable, Selectable)]
#[diesel(treat_none_as_null = true)]
#[diesel(belongs_to(Cliente))]
#[diesel(table_name = sucursal)]
#[diesel(check_for_backend(Pg))]
pub struct Sucursal {
    pub id: i64,
    pub cliente_id: i64,
    pub nombre_sucursal: String,
    pub codigo_sucursal: Option<String>,
    pub telefono: Option<String>,
    pub telefono_alternativo: Option<String>,
    pub email: Option<String>,
    pub calle: Option<String>,
    pub numero_exterior: Option<String>,
    pub numero_interior: Option<String>,
    pub colonia: Option<String>,
    pub codigo_postal: Option<String>,
    pub ciudad: Option<String>,
    pub estado: Option<String>,
    pub notas: Option<String>,
    pub activo: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Sucursal {
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
