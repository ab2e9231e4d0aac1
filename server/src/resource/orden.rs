use crate::model::cliente::Cliente;
use crate::model::enums::{EstadoOrden, EstadoSubtarea, Prioridad, TipoPermiso};
use crate::model::orden::{Categoria, FotoEntrada, OrdenTrabajo, Subcategoria, Subtarea};
use crate::resource::{self, name_of};
use crate::schema::{categoria_orden, cliente, orden_foto_entrada, subcategoria_orden, subtarea_orden, sucursal};
use crate::time::DateTime;
use crate::workshop::{board, progress};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct CategoriaInfo {
    id: i64,
    nombre: String,
    descripcion: Option<String>,
    activo: bool,
    created_at: DateTime,
}

impl From<Categoria> for CategoriaInfo {
    fn from(categoria: Categoria) -> Self {
        Self {
            id: categoria.id,
            nombre: categoria.nombre,
            descripcion: categoria.descripcion,
            activo: categoria.activo,
            created_at: categoria.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubcategoriaInfo {
    id: i64,
    categoria_id: i64,
    nombre: String,
    descripcion: Option<String>,
    activo: bool,
    created_at: DateTime,
}

impl From<Subcategoria> for SubcategoriaInfo {
    fn from(subcategoria: Subcategoria) -> Self {
        Self {
            id: subcategoria.id,
            categoria_id: subcategoria.categoria_id,
            nombre: subcategoria.nombre,
            descripcion: subcategoria.descripcion,
            activo: subcategoria.activo,
            created_at: subcategoria.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubtareaInfo {
    id: i64,
    orden_trabajo_id: i64,
    titulo: String,
    descripcion: Option<String>,
    tecnico_asignado_id: Option<i64>,
    tecnico_nombre: Option<String>,
    estado: EstadoSubtarea,
    /// Position of the subtask within its order.
    orden: i32,
    fecha_inicio: Option<DateTime>,
    fecha_completada: Option<DateTime>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl SubtareaInfo {
    pub fn new(conn: &mut PgConnection, subtarea: Subtarea) -> QueryResult<Self> {
        let names = resource::user_names(conn, subtarea.tecnico_asignado_id)?;
        Ok(Self::build(subtarea, &names))
    }

    fn build(subtarea: Subtarea, names: &HashMap<i64, String>) -> Self {
        Self {
            id: subtarea.id,
            orden_trabajo_id: subtarea.orden_trabajo_id,
            titulo: subtarea.titulo,
            descripcion: subtarea.descripcion,
            tecnico_asignado_id: subtarea.tecnico_asignado_id,
            tecnico_nombre: name_of(names, subtarea.tecnico_asignado_id),
            estado: subtarea.estado,
            orden: subtarea.orden,
            fecha_inicio: subtarea.fecha_inicio,
            fecha_completada: subtarea.fecha_completada,
            created_at: subtarea.created_at,
            updated_at: subtarea.updated_at,
        }
    }
}

/// A work order as shown in lists and on the status board.
#[derive(Serialize, ToSchema)]
pub struct OrdenSummary {
    id: i64,
    folio: String,
    cliente_id: i64,
    cliente_nombre: Option<String>,
    sucursal_id: Option<i64>,
    sucursal_nombre: Option<String>,
    categoria_nombre: Option<String>,
    subcategoria_nombre: Option<String>,
    descripcion: String,
    estatus: EstadoOrden,
    prioridad: Prioridad,
    fecha_recepcion: DateTime,
    fecha_promesa: Option<DateTime>,
    tecnico_asignado_id: Option<i64>,
    tecnico_nombre: Option<String>,
    precio_final: Option<Decimal>,
    dias_desde_recepcion: i64,
    esta_retrasada: bool,
    porcentaje_completado: i32,
}

impl OrdenSummary {
    /// Builds summaries for a batch of orders, preserving their order.
    pub fn new_batch(conn: &mut PgConnection, ordenes: Vec<OrdenTrabajo>) -> QueryResult<Vec<Self>> {
        let related = RelatedNames::load(conn, &ordenes)?;
        let subtareas: Vec<Vec<Subtarea>> = Subtarea::belonging_to(&ordenes)
            .select(Subtarea::as_select())
            .load(conn)?
            .grouped_by(&ordenes);

        let now = DateTime::now();
        Ok(ordenes
            .into_iter()
            .zip(subtareas)
            .map(|(orden, subtareas)| Self {
                cliente_nombre: related.clientes.get(&orden.cliente_id).cloned(),
                sucursal_nombre: orden.sucursal_id.and_then(|id| related.sucursales.get(&id)).cloned(),
                categoria_nombre: orden.categoria_id.and_then(|id| related.categorias.get(&id)).cloned(),
                subcategoria_nombre: orden.subcategoria_id.and_then(|id| related.subcategorias.get(&id)).cloned(),
                tecnico_nombre: name_of(&related.users, orden.tecnico_asignado_id),
                dias_desde_recepcion: progress::dias_desde_recepcion(&orden, now),
                esta_retrasada: progress::esta_retrasada(orden.estatus, orden.fecha_promesa, now),
                porcentaje_completado: progress::porcentaje_completado(subtareas.iter().map(|subtarea| subtarea.estado)),
                id: orden.id,
                folio: orden.folio,
                cliente_id: orden.cliente_id,
                sucursal_id: orden.sucursal_id,
                descripcion: orden.descripcion,
                estatus: orden.estatus,
                prioridad: orden.prioridad,
                fecha_recepcion: orden.fecha_recepcion,
                fecha_promesa: orden.fecha_promesa,
                tecnico_asignado_id: orden.tecnico_asignado_id,
                precio_final: orden.precio_final,
            })
            .collect())
    }
}

/// One column of the work order status board.
#[derive(Serialize, ToSchema)]
pub struct BoardColumn {
    /// Status orders receive when dropped on this column.
    estatus: EstadoOrden,
    ordenes: Vec<OrdenSummary>,
}

impl BoardColumn {
    /// Distributes `ordenes` over the board columns, keeping their relative order.
    pub fn group(ordenes: Vec<OrdenSummary>) -> Vec<Self> {
        let mut columns: Vec<Self> = board::COLUMNS
            .into_iter()
            .map(|estatus| Self {
                estatus,
                ordenes: Vec::new(),
            })
            .collect();
        for orden in ordenes {
            let column = board::column_for(orden.estatus);
            if let Some(column) = columns.iter_mut().find(|candidate| candidate.estatus == column) {
                column.ordenes.push(orden);
            }
        }
        columns
    }
}

/// A work order with everything the detail view shows.
#[derive(Serialize, ToSchema)]
pub struct OrdenInfo {
    id: i64,
    folio: String,
    cliente_id: i64,
    cliente_nombre: Option<String>,
    sucursal_id: Option<i64>,
    sucursal_nombre: Option<String>,
    categoria_id: Option<i64>,
    categoria_nombre: Option<String>,
    subcategoria_id: Option<i64>,
    subcategoria_nombre: Option<String>,
    usuario_recepcion_id: i64,
    usuario_recepcion_nombre: Option<String>,
    tecnico_asignado_id: Option<i64>,
    tecnico_nombre: Option<String>,
    descripcion: String,
    observaciones: Option<String>,
    nombre_contacto_notificacion: Option<String>,
    telefono_contacto_notificacion: Option<String>,
    foto_entrada: Option<String>,
    foto_salida: Option<String>,
    /// Every entry photo of the order, oldest first.
    fotos_entrada: Vec<String>,
    tipo_permiso: Option<TipoPermiso>,
    numero_permiso: Option<String>,
    precio_estimado: Option<Decimal>,
    anticipo: Decimal,
    precio_final: Option<Decimal>,
    /// Null if the final price minus the advance can't be represented.
    saldo_pendiente: Option<Decimal>,
    estatus: EstadoOrden,
    prioridad: Prioridad,
    fecha_recepcion: DateTime,
    fecha_promesa: Option<DateTime>,
    fecha_inicio_trabajo: Option<DateTime>,
    fecha_terminado: Option<DateTime>,
    fecha_entrega: Option<DateTime>,
    dias_desde_recepcion: i64,
    esta_retrasada: bool,
    porcentaje_completado: i32,
    subtareas: Vec<SubtareaInfo>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl OrdenInfo {
    pub fn new(conn: &mut PgConnection, orden: OrdenTrabajo) -> QueryResult<Self> {
        let subtareas: Vec<Subtarea> = Subtarea::belonging_to(&orden)
            .select(Subtarea::as_select())
            .order_by((subtarea_orden::orden, subtarea_orden::id))
            .load(conn)?;
        let fotos_entrada: Vec<String> = FotoEntrada::belonging_to(&orden)
            .select(orden_foto_entrada::url)
            .order_by(orden_foto_entrada::id)
            .load(conn)?;

        let mut related = RelatedNames::load(conn, std::slice::from_ref(&orden))?;
        let subtask_technicians = subtareas.iter().filter_map(|subtarea| subtarea.tecnico_asignado_id);
        related.users.extend(resource::user_names(conn, subtask_technicians)?);

        let now = DateTime::now();
        Ok(Self {
            cliente_nombre: related.clientes.get(&orden.cliente_id).cloned(),
            sucursal_nombre: orden.sucursal_id.and_then(|id| related.sucursales.get(&id)).cloned(),
            categoria_nombre: orden.categoria_id.and_then(|id| related.categorias.get(&id)).cloned(),
            subcategoria_nombre: orden.subcategoria_id.and_then(|id| related.subcategorias.get(&id)).cloned(),
            usuario_recepcion_nombre: name_of(&related.users, Some(orden.usuario_recepcion_id)),
            tecnico_nombre: name_of(&related.users, orden.tecnico_asignado_id),
            dias_desde_recepcion: progress::dias_desde_recepcion(&orden, now),
            esta_retrasada: progress::esta_retrasada(orden.estatus, orden.fecha_promesa, now),
            saldo_pendiente: progress::saldo_pendiente(orden.precio_final, orden.anticipo),
            porcentaje_completado: progress::porcentaje_completado(subtareas.iter().map(|subtarea| subtarea.estado)),
            subtareas: subtareas
                .into_iter()
                .map(|subtarea| SubtareaInfo::build(subtarea, &related.users))
                .collect(),
            fotos_entrada,
            id: orden.id,
            folio: orden.folio,
            cliente_id: orden.cliente_id,
            sucursal_id: orden.sucursal_id,
            categoria_id: orden.categoria_id,
            subcategoria_id: orden.subcategoria_id,
            usuario_recepcion_id: orden.usuario_recepcion_id,
            tecnico_asignado_id: orden.tecnico_asignado_id,
            descripcion: orden.descripcion,
            observaciones: orden.observaciones,
            nombre_contacto_notificacion: orden.nombre_contacto_notificacion,
            telefono_contacto_notificacion: orden.telefono_contacto_notificacion,
            foto_entrada: orden.foto_entrada,
            foto_salida: orden.foto_salida,
            tipo_permiso: orden.tipo_permiso,
            numero_permiso: orden.numero_permiso,
            precio_estimado: orden.precio_estimado,
            anticipo: orden.anticipo,
            precio_final: orden.precio_final,
            estatus: orden.estatus,
            prioridad: orden.prioridad,
            fecha_recepcion: orden.fecha_recepcion,
            fecha_promesa: orden.fecha_promesa,
            fecha_inicio_trabajo: orden.fecha_inicio_trabajo,
            fecha_terminado: orden.fecha_terminado,
            fecha_entrega: orden.fecha_entrega,
            created_at: orden.created_at,
            updated_at: orden.updated_at,
        })
    }
}

/// Display names of the records a batch of orders refers to, keyed by id.
#[derive(Default)]
struct RelatedNames {
    clientes: HashMap<i64, String>,
    sucursales: HashMap<i64, String>,
    categorias: HashMap<i64, String>,
    subcategorias: HashMap<i64, String>,
    users: HashMap<i64, String>,
}

impl RelatedNames {
    fn load(conn: &mut PgConnection, ordenes: &[OrdenTrabajo]) -> QueryResult<Self> {
        if ordenes.is_empty() {
            return Ok(Self::default());
        }

        let cliente_ids: Vec<i64> = ordenes.iter().map(|orden| orden.cliente_id).collect();
        let sucursal_ids: Vec<i64> = ordenes.iter().filter_map(|orden| orden.sucursal_id).collect();
        let categoria_ids: Vec<i64> = ordenes.iter().filter_map(|orden| orden.categoria_id).collect();
        let subcategoria_ids: Vec<i64> = ordenes.iter().filter_map(|orden| orden.subcategoria_id).collect();
        let user_ids = ordenes
            .iter()
            .flat_map(|orden| [Some(orden.usuario_recepcion_id), orden.tecnico_asignado_id])
            .flatten();

        let clientes = cliente::table
            .select(Cliente::as_select())
            .filter(cliente::id.eq_any(cliente_ids))
            .load(conn)?
            .into_iter()
            .map(|cliente: Cliente| (cliente.id, cliente.nombre_completo()))
            .collect();
        let sucursales: Vec<(i64, String)> = sucursal::table
            .select((sucursal::id, sucursal::nombre_sucursal))
            .filter(sucursal::id.eq_any(sucursal_ids))
            .load(conn)?;
        let categorias: Vec<(i64, String)> = categoria_orden::table
            .select((categoria_orden::id, categoria_orden::nombre))
            .filter(categoria_orden::id.eq_any(categoria_ids))
            .load(conn)?;
        let subcategorias: Vec<(i64, String)> = subcategoria_orden::table
            .select((subcategoria_orden::id, subcategoria_orden::nombre))
            .filter(subcategoria_orden::id.eq_any(subcategoria_ids))
            .load(conn)?;

        Ok(Self {
            clientes,
            sucursales: sucursales.into_iter().collect(),
            categorias: categorias.into_iter().collect(),
            subcategorias: subcategorias.into_iter().collect(),
            users: resource::user_names(conn, user_ids)?,
        })
    }
}
