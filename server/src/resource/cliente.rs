use crate::model::cliente::Cliente;
use crate::model::enums::TipoCliente;
use crate::time::DateTime;
use serde::Serialize;
use time::Date;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ClienteInfo {
    id: i64,
    tipo_cliente: TipoCliente,
    nombre: String,
    apellido_paterno: Option<String>,
    apellido_materno: Option<String>,
    razon_social: Option<String>,
    rfc: Option<String>,
    email: Option<String>,
    telefono: String,
    telefono_alternativo: Option<String>,
    calle: Option<String>,
    numero_exterior: Option<String>,
    numero_interior: Option<String>,
    colonia: Option<String>,
    codigo_postal: Option<String>,
    ciudad: Option<String>,
    estado: Option<String>,
    fecha_nacimiento: Option<Date>,
    notas: Option<String>,
    preferencias: Option<String>,
    activo: bool,
    created_at: DateTime,
    updated_at: DateTime,
    /// Legal name of companies, given name and surnames of individuals.
    nombre_completo: String,
    direccion_completa: String,
}

impl From<Cliente> for ClienteInfo {
    fn from(cliente: Cliente) -> Self {
        let nombre_completo = cliente.nombre_completo();
        let direccion_completa = cliente.address().full();
        Self {
            id: cliente.id,
            tipo_cliente: cliente.tipo_cliente,
            nombre: cliente.nombre,
            apellido_paterno: cliente.apellido_paterno,
            apellido_materno: cliente.apellido_materno,
            razon_social: cliente.razon_social,
            rfc: cliente.rfc,
            email: cliente.email,
            telefono: cliente.telefono,
            telefono_alternativo: cliente.telefono_alternativo,
            calle: cliente.calle,
            numero_exterior: cliente.numero_exterior,
            numero_interior: cliente.numero_interior,
            colonia: cliente.colonia,
            codigo_postal: cliente.codigo_postal,
            ciudad: cliente.ciudad,
            estado: cliente.estado,
            fecha_nacimiento: cliente.fecha_nacimiento,
            notas: cliente.notas,
            preferencias: cliente.preferencias,
            activo: cliente.activo,
            created_at: cliente.created_at,
            updated_at: cliente.updated_at,
            nombre_completo,
            direccion_completa,
        }
    }
}
