use crate::model::enums::{EstadoOrden, EstadoSubtarea, Prioridad, TipoPermiso};
use crate::schema::{categoria_orden, orden_foto_entrada, orden_trabajo, subcategoria_orden, subtarea_orden};
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use rust_decimal::Decimal;

#[derive(Insertable)]
#[diesel(table_name = categoria_orden)]
#[diesel(check_for_backend(Pg))]
pub struct NewCategoria<'a> {
    pub nombre: &'a str,
    pub descripcion: Option<&'a str>,
    pub activo: bool,
}

#[derive(Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = categoria_orden)]
#[diesel(check_for_backend(Pg))]
pub struct Categoria {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub activo: bool,
    pub created_at: DateTime,
}

#[derive(Insertable)]
#[diesel(table_name = subcategoria_orden)]
#[diesel(check_for_backend(Pg))]
pub struct NewSubcategoria<'a> {
    pub categoria_id: i64,
    pub nombre: &'a str,
    pub descripcion: Option<&'a str>,
    pub activo: bool,
}

#[derive(Clone, Associations, Identifiable, Queryable, Selectable)]
#[diesel(belongs_to(Categoria))]
#[diesel(table_name = subcategoria_orden)]
#[diesel(check_for_backend(Pg))]
pub struct Subcategoria {
    pub id: i64,
    pub categoria_id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub activo: bool,
    pub created_at: DateTime,
}

#[derive(Insertable)]
#[diesel(table_name = orden_trabajo)]
#[diesel(check_for_backend(Pg))]
pub struct NewOrdenTrabajo<'a> {
    pub folio: &'a str,
    pub cliente_id: i64,
    pub sucursal_id: Option<i64>,
    pub categoria_id: Option<i64>,
    pub subcategoria_id: Option<i64>,
    pub usuario_recepcion_id: i64,
    pub tecnico_asignado_id: Option<i64>,
    pub descripcion: &'a str,
    pub observaciones: Option<&'a str>,
    pub nombre_contacto_notificacion: Option<&'a str>,
    pub telefono_contacto_notificacion: Option<&'a str>,
    pub tipo_permiso: Option<TipoPermiso>,
    pub numero_permiso: Option<&'a str>,
    pub precio_estimado: Option<Decimal>,
    pub anticipo: Decimal,
    pub precio_final: Option<Decimal>,
    pub estatus: EstadoOrden,
    pub prioridad: Prioridad,
    pub fecha_promesa: Option<DateTime>,
}

/// A work order ("orden de trabajo", OT).
#[derive(Clone, AsChangeset, Identifiable, Queryable, Selectable)]
#[diesel(treat_none_as_null = true)]
#[diesel(table_name = orden_trabajo)]
#[diesel(check_for_backend(Pg))]
pub struct OrdenTrabajo {
    pub id: i64,
    pub folio: String,
    pub cliente_id: i64,
    pub sucursal_id: Option<i64>,
    pub categoria_id: Option<i64>,
    pub subcategoria_id: Option<i64>,
    pub usuario_recepcion_id: i64,
    pub tecnico_asignado_id: Option<i64>,
    pub descripcion: String,
    pub observaciones: Option<String>,
    pub nombre_contacto_notificacion: Option<String>,
    pub telefono_contacto_notificacion: Option<String>,
    pub foto_entrada: Option<String>,
    pub foto_salida: Option<String>,
    pub tipo_permiso: Option<TipoPermiso>,
    pub numero_permiso: Option<String>,
    pub precio_estimado: Option<Decimal>,
    pub anticipo: Decimal,
    pub precio_final: Option<Decimal>,
    pub estatus: EstadoOrden,
    pub prioridad: Prioridad,
    pub fecha_recepcion: DateTime,
    pub fecha_promesa: Option<DateTime>,
    pub fecha_inicio_trabajo: Option<DateTime>,
    pub fecha_terminado: Option<DateTime>,
    pub fecha_entrega: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Insertable)]
#[diesel(table_name = orden_foto_entrada)]
#[diesel(check_for_backend(Pg))]
pub struct NewFotoEntrada<'a> {
    pub orden_trabajo_id: i64,
    pub url: &'a str,
}

#[derive(Associations, Identifiable, Queryable, Selectable)]
#[diesel(belongs_to(OrdenTrabajo))]
#[diesel(table_name = orden_foto_entrada)]
#[diesel(check_for_backend(Pg))]
pub struct FotoEntrada {
    pub id: i64,
    pub orden_trabajo_id: i64,
    pub url: String,
    pub created_at: DateTime,
}

#[derive(Insertable)]
#[diesel(table_name = subtarea_orden)]
#[diesel(check_for_backend(Pg))]
pub struct NewSubtarea<'a> {
    pub orden_trabajo_id: i64,
    pub titulo: &'a str,
    pub descripcion: Option<&'a str>,
    pub tecnico_asignado_id: Option<i64>,
    pub estado: EstadoSubtarea,
    pub orden: i32,
}

#[derive(Clone, AsChangeset, Associations, Identifiable, Queryable, Selectable)]
#[diesel(treat_none_as_null = true)]
#[diesel(belongs_to(OrdenTrabajo))]
#[diesel(table_name = subtarea_orden)]
#[diesel(check_for_backend(Pg))]
pub struct Subtarea {
    pub id: i64,
    pub orden_trabajo_id: i64,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub tecnico_asignado_id: Option<i64>,
    pub estado: EstadoSubtarea,
    pub orden: i32,
    pub fecha_inicio: Option<DateTime>,
    pub fecha_completada: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
