use crate::model::cliente::Cliente;
use crate::model::sucursal::Sucursal;
use crate::schema::cliente;
use crate::time::DateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SucursalInfo {
    id: i64,
    cliente_id: i64,
    nombre_sucursal: String,
    codigo_sucursal: Option<String>,
    telefono: Option<String>,
    telefono_alternativo: Option<String>,
    email: Option<String>,
    calle: Option<String>,
    numero_exterior: Option<String>,
    numero_interior: Option<String>,
    colonia: Option<String>,
    codigo_postal: Option<String>,
    ciudad: Option<String>,
    estado: Option<String>,
    notas: Option<String>,
    activo: bool,
    created_at: DateTime,
    updated_at: DateTime,
    direccion_completa: String,
    /// Display name of the owning client.
    cliente_nombre: Option<String>,
    cliente_rfc: Option<String>,
}

impl SucursalInfo {
    pub fn new(conn: &mut PgConnection, sucursal: Sucursal) -> QueryResult<Self> {
        let cliente: Option<Cliente> = cliente::table
            .find(sucursal.cliente_id)
            .select(Cliente::as_select())
            .first(conn)
            .optional()?;
        Ok(Self::build(sucursal, cliente.as_ref()))
    }

    /// Builds infos for a batch of branches, loading their clients in one query.
    pub fn new_batch(conn: &mut PgConnection, sucursales: Vec<Sucursal>) -> QueryResult<Vec<Self>> {
        let cliente_ids: Vec<i64> = sucursales.iter().map(|sucursal| sucursal.cliente_id).collect();
        let clientes: HashMap<i64, Cliente> = cliente::table
            .select(Cliente::as_select())
            .filter(cliente::id.eq_any(cliente_ids))
            .load(conn)?
            .into_iter()
            .map(|cliente: Cliente| (cliente.id, cliente))
            .collect();
        Ok(sucursales
            .into_iter()
            .map(|sucursal| {
                let cliente = clientes.get(&sucursal.cliente_id);
                Self::build(sucursal, cliente)
            })
            .collect())
    }

    fn build(sucursal: Sucursal, cliente: Option<&Cliente>) -> Self {
        let direccion_completa = sucursal.address().full();
        Self {
            id: sucursal.id,
            cliente_id: sucursal.cliente_id,
            nombre_sucursal: sucursal.nombre_sucursal,
            codigo_sucursal: sucursal.codigo_sucursal,
            telefono: sucursal.telefono,
            telefono_alternativo: sucursal.telefono_alternativo,
            email: sucursal.email,
            calle: sucursal.calle,
            numero_exterior: sucursal.numero_exterior,
            numero_interior: sucursal.numero_interior,
            colonia: sucursal.colonia,
            codigo_postal: sucursal.codigo_postal,
            ciudad: sucursal.ciudad,
            estado: sucursal.estado,
            notas: sucursal.notas,
            activo: sucursal.activo,
            created_at: sucursal.created_at,
            updated_at: sucursal.updated_at,
            direccion_completa,
            cliente_nombre: cliente.map(Cliente::nombre_completo),
            cliente_rfc: cliente.and_then(|cliente| cliente.rfc.clone()),
        }
    }
}
