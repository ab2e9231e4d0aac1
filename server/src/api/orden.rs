use crate::api::doc::ORDEN_TAG;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Multipart, Path, Query};
use crate::api::{self, ADMIN, FRONT_DESK, STAFF};
use crate::app::AppState;
use crate::auth::Client;
use crate::filesystem;
use crate::model::enums::{EstadoOrden, EstadoSubtarea, Prioridad, ResourceProperty, ResourceType, Rol, TipoPermiso};
use crate::model::orden::{
    Categoria, NewCategoria, NewFotoEntrada, NewOrdenTrabajo, NewSubcategoria, NewSubtarea, OrdenTrabajo,
    Subcategoria, Subtarea,
};
use crate::resource::orden::{BoardColumn, CategoriaInfo, OrdenInfo, OrdenSummary, SubcategoriaInfo, SubtareaInfo};
use crate::schema::{categoria_orden, cliente, orden_foto_entrada, orden_trabajo, subcategoria_orden, subtarea_orden, sucursal, usuario};
use crate::time::DateTime;
use crate::workshop::{board, folio};
use axum::extract::multipart::Multipart as AxumMultipart;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use diesel::dsl::{IntoBoxed, Select, exists};
use diesel::pg::Pg;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_categorias, create_categoria))
        .routes(routes!(list_subcategorias))
        .routes(routes!(create_subcategoria))
        .routes(routes!(list, create))
        .routes(routes!(tablero))
        .routes(routes!(get, update, delete))
        .routes(routes!(change_status))
        .routes(routes!(move_on_board))
        .routes(routes!(upload_photo))
        .routes(routes!(create_subtarea))
        .routes(routes!(update_subtarea, delete_subtarea))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ActiveParams {
    activo: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/categorias",
    tag = ORDEN_TAG,
    params(ActiveParams),
    responses((status = 200, body = Vec<CategoriaInfo>)),
)]
async fn list_categorias(
    State(state): State<AppState>,
    Query(params): Query<ActiveParams>,
) -> ApiResult<Json<Vec<CategoriaInfo>>> {
    let mut query = categoria_orden::table.select(Categoria::as_select()).into_boxed();
    if let Some(activo) = params.activo {
        query = query.filter(categoria_orden::activo.eq(activo));
    }

    let categorias: Vec<Categoria> = query
        .order_by(categoria_orden::nombre)
        .load(&mut state.get_connection()?)?;
    Ok(Json(categorias.into_iter().map(CategoriaInfo::from).collect()))
}

#[derive(Deserialize, ToSchema)]
struct CategoriaCreateBody {
    /// Unique, at most 100 characters.
    nombre: String,
    descripcion: Option<String>,
    #[serde(default = "active_by_default")]
    activo: bool,
}

fn active_by_default() -> bool {
    true
}

#[utoipa::path(
    post,
    path = "/categorias",
    tag = ORDEN_TAG,
    request_body = CategoriaCreateBody,
    responses(
        (status = 201, body = CategoriaInfo),
        (status = 400, description = "Name is invalid or already in use"),
        (status = 403, description = "Requires ADMIN"),
    ),
)]
async fn create_categoria(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Json(body): Json<CategoriaCreateBody>,
) -> ApiResult<(StatusCode, Json<CategoriaInfo>)> {
    api::verify_role(&client, ADMIN)?;

    let nombre = body.nombre.trim();
    let descripcion = api::non_blank(body.descripcion);
    api::verify_length("nombre", nombre, 1, 100)?;
    api::verify_max_length("descripcion", descripcion.as_deref(), 255)?;

    let new_categoria = NewCategoria {
        nombre,
        descripcion: descripcion.as_deref(),
        activo: body.activo,
    };
    let categoria = new_categoria
        .insert_into(categoria_orden::table)
        .returning(Categoria::as_returning())
        .get_result(&mut state.get_connection()?);
    let categoria = api::error::map_unique_violation(categoria, ResourceProperty::CategoriaNombre)?;
    tracing::info!("Created order category {}", categoria.nombre);
    Ok((StatusCode::CREATED, Json(CategoriaInfo::from(categoria))))
}

#[utoipa::path(
    get,
    path = "/categorias/{id}/subcategorias",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Category id"), ActiveParams),
    responses(
        (status = 200, body = Vec<SubcategoriaInfo>),
        (status = 404, description = "Category does not exist"),
    ),
)]
async fn list_subcategorias(
    State(state): State<AppState>,
    Path(categoria_id): Path<i64>,
    Query(params): Query<ActiveParams>,
) -> ApiResult<Json<Vec<SubcategoriaInfo>>> {
    let mut query = subcategoria_orden::table
        .select(Subcategoria::as_select())
        .filter(subcategoria_orden::categoria_id.eq(categoria_id))
        .into_boxed();
    if let Some(activo) = params.activo {
        query = query.filter(subcategoria_orden::activo.eq(activo));
    }

    state.get_connection()?.transaction(|conn| {
        let categoria_exists: bool = diesel::select(exists(categoria_orden::table.find(categoria_id))).get_result(conn)?;
        if !categoria_exists {
            return Err(ApiError::NotFound(ResourceType::Categoria));
        }

        let subcategorias: Vec<Subcategoria> = query.order_by(subcategoria_orden::nombre).load(conn)?;
        Ok(Json(subcategorias.into_iter().map(SubcategoriaInfo::from).collect()))
    })
}

#[derive(Deserialize, ToSchema)]
struct SubcategoriaCreateBody {
    categoria_id: i64,
    /// At most 100 characters.
    nombre: String,
    descripcion: Option<String>,
    #[serde(default = "active_by_default")]
    activo: bool,
}

#[utoipa::path(
    post,
    path = "/subcategorias",
    tag = ORDEN_TAG,
    request_body = SubcategoriaCreateBody,
    responses(
        (status = 201, body = SubcategoriaInfo),
        (status = 400, description = "Name is invalid"),
        (status = 403, description = "Requires ADMIN"),
        (status = 404, description = "Category does not exist"),
    ),
)]
async fn create_subcategoria(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Json(body): Json<SubcategoriaCreateBody>,
) -> ApiResult<(StatusCode, Json<SubcategoriaInfo>)> {
    api::verify_role(&client, ADMIN)?;

    let nombre = body.nombre.trim();
    let descripcion = api::non_blank(body.descripcion);
    api::verify_length("nombre", nombre, 1, 100)?;
    api::verify_max_length("descripcion", descripcion.as_deref(), 255)?;

    let new_subcategoria = NewSubcategoria {
        categoria_id: body.categoria_id,
        nombre,
        descripcion: descripcion.as_deref(),
        activo: body.activo,
    };
    let subcategoria = new_subcategoria
        .insert_into(subcategoria_orden::table)
        .returning(Subcategoria::as_returning())
        .get_result(&mut state.get_connection()?);
    let subcategoria = api::error::map_foreign_key_violation(subcategoria, ResourceType::Categoria)?;
    Ok((StatusCode::CREATED, Json(SubcategoriaInfo::from(subcategoria))))
}

/// Query parameters of the order list.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct OrdenListParams {
    estatus: Option<EstadoOrden>,
    cliente_id: Option<i64>,
    /// Only orders assigned to this technician. Technicians always see only their own orders.
    tecnico_id: Option<i64>,
    categoria_id: Option<i64>,
    prioridad: Option<Prioridad>,
    /// Matches the folio, the description or the client's name.
    search: Option<String>,
    skip: Option<i64>,
    limit: Option<i64>,
}

/// Query parameters of the status board. The board always shows every status.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct TableroParams {
    cliente_id: Option<i64>,
    tecnico_id: Option<i64>,
    categoria_id: Option<i64>,
    prioridad: Option<Prioridad>,
    search: Option<String>,
}

type BoxedIdQuery = IntoBoxed<'static, Select<orden_trabajo::table, orden_trabajo::id>, Pg>;

struct OrdenFilter {
    estatus: Option<EstadoOrden>,
    cliente_id: Option<i64>,
    tecnico_id: Option<i64>,
    categoria_id: Option<i64>,
    prioridad: Option<Prioridad>,
    search: Option<String>,
}

impl OrdenFilter {
    /// Builds a query for the ids of the orders `client` can see that match the filter.
    fn ids(self, client: &Client) -> BoxedIdQuery {
        let mut query = orden_trabajo::table.select(orden_trabajo::id).into_boxed();
        if client.rol == Rol::Tecnico {
            query = query.filter(orden_trabajo::tecnico_asignado_id.eq(client.id));
        }
        if let Some(estatus) = self.estatus {
            query = query.filter(orden_trabajo::estatus.eq(estatus));
        }
        if let Some(cliente_id) = self.cliente_id {
            query = query.filter(orden_trabajo::cliente_id.eq(cliente_id));
        }
        if let Some(tecnico_id) = self.tecnico_id {
            query = query.filter(orden_trabajo::tecnico_asignado_id.eq(tecnico_id));
        }
        if let Some(categoria_id) = self.categoria_id {
            query = query.filter(orden_trabajo::categoria_id.eq(categoria_id));
        }
        if let Some(prioridad) = self.prioridad {
            query = query.filter(orden_trabajo::prioridad.eq(prioridad));
        }
        if let Some(search) = api::non_blank(self.search) {
            let pattern = format!("%{search}%");
            let matching_clientes = cliente::table
                .select(cliente::id)
                .filter(cliente::nombre.ilike(pattern.clone()).or(cliente::razon_social.ilike(pattern.clone())));
            query = query.filter(
                orden_trabajo::folio
                    .ilike(pattern.clone())
                    .or(orden_trabajo::descripcion.ilike(pattern))
                    .or(orden_trabajo::cliente_id.eq_any(matching_clientes)),
            );
        }
        query
    }
}

#[utoipa::path(
    get,
    path = "/ordenes",
    tag = ORDEN_TAG,
    params(OrdenListParams),
    responses(
        (status = 200, body = Vec<OrdenSummary>),
        (status = 403, description = "Requires ADMIN, RECEPCION or TECNICO"),
    ),
)]
async fn list(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<OrdenListParams>,
) -> ApiResult<Json<Vec<OrdenSummary>>> {
    api::verify_role(&client, STAFF)?;

    let (offset, limit) = api::page(params.skip, params.limit);
    let filter = OrdenFilter {
        estatus: params.estatus,
        cliente_id: params.cliente_id,
        tecnico_id: params.tecnico_id,
        categoria_id: params.categoria_id,
        prioridad: params.prioridad,
        search: params.search,
    };
    let ids = filter.ids(&client);

    state.get_connection()?.transaction(|conn| {
        let ordenes: Vec<OrdenTrabajo> = orden_trabajo::table
            .filter(orden_trabajo::id.eq_any(ids))
            .select(OrdenTrabajo::as_select())
            .order_by((orden_trabajo::fecha_recepcion.desc(), orden_trabajo::id.desc()))
            .offset(offset)
            .limit(limit)
            .load(conn)?;
        OrdenSummary::new_batch(conn, ordenes)
            .map(Json)
            .map_err(ApiError::from)
    })
}

/// Returns the visible orders grouped in the columns of the status board.
#[utoipa::path(
    get,
    path = "/ordenes/tablero",
    tag = ORDEN_TAG,
    params(TableroParams),
    responses(
        (status = 200, body = Vec<BoardColumn>),
        (status = 403, description = "Requires ADMIN, RECEPCION or TECNICO"),
    ),
)]
async fn tablero(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<TableroParams>,
) -> ApiResult<Json<Vec<BoardColumn>>> {
    api::verify_role(&client, STAFF)?;

    let filter = OrdenFilter {
        estatus: None,
        cliente_id: params.cliente_id,
        tecnico_id: params.tecnico_id,
        categoria_id: params.categoria_id,
        prioridad: params.prioridad,
        search: params.search,
    };
    let ids = filter.ids(&client);

    state.get_connection()?.transaction(|conn| {
        let ordenes: Vec<OrdenTrabajo> = orden_trabajo::table
            .filter(orden_trabajo::id.eq_any(ids))
            .select(OrdenTrabajo::as_select())
            .order_by((orden_trabajo::prioridad.desc(), orden_trabajo::fecha_recepcion, orden_trabajo::id))
            .load(conn)?;
        let summaries = OrdenSummary::new_batch(conn, ordenes)?;
        Ok(Json(BoardColumn::group(summaries)))
    })
}

#[utoipa::path(
    get,
    path = "/ordenes/{id}",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Work order id")),
    responses(
        (status = 200, body = OrdenInfo),
        (status = 403, description = "Technicians can only see their own orders"),
        (status = 404, description = "Work order does not exist"),
    ),
)]
async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(orden_id): Path<i64>,
) -> ApiResult<Json<OrdenInfo>> {
    api::verify_role(&client, STAFF)?;

    state.get_connection()?.transaction(|conn| {
        let orden = find_orden(conn, orden_id)?;
        verify_assigned(&client, &orden, "ver esta orden")?;
        OrdenInfo::new(conn, orden).map(Json).map_err(ApiError::from)
    })
}

/// Request body for creating a work order. The folio, the receiving user and
/// the reception date are assigned by the server.
#[derive(Deserialize, ToSchema)]
struct OrdenCreateBody {
    cliente_id: i64,
    /// Must belong to the client.
    sucursal_id: Option<i64>,
    categoria_id: Option<i64>,
    /// Must belong to the category.
    subcategoria_id: Option<i64>,
    /// Must be a user with role TECNICO.
    tecnico_asignado_id: Option<i64>,
    /// At least 10 characters.
    descripcion: String,
    observaciones: Option<String>,
    nombre_contacto_notificacion: Option<String>,
    telefono_contacto_notificacion: Option<String>,
    tipo_permiso: Option<TipoPermiso>,
    numero_permiso: Option<String>,
    precio_estimado: Option<Decimal>,
    #[serde(default)]
    anticipo: Decimal,
    precio_final: Option<Decimal>,
    #[serde(default)]
    estatus: EstadoOrden,
    #[serde(default)]
    prioridad: Prioridad,
    fecha_promesa: Option<DateTime>,
}

impl OrdenCreateBody {
    fn normalized(self) -> Self {
        Self {
            descripcion: self.descripcion.trim().to_owned(),
            observaciones: api::non_blank(self.observaciones),
            nombre_contacto_notificacion: api::non_blank(self.nombre_contacto_notificacion),
            telefono_contacto_notificacion: api::non_blank(self.telefono_contacto_notificacion),
            numero_permiso: api::non_blank(self.numero_permiso),
            ..self
        }
    }

    fn validate(&self) -> ApiResult<()> {
        OrdenText {
            descripcion: Some(&self.descripcion),
            nombre_contacto_notificacion: self.nombre_contacto_notificacion.as_deref(),
            telefono_contacto_notificacion: self.telefono_contacto_notificacion.as_deref(),
            numero_permiso: self.numero_permiso.as_deref(),
        }
        .validate()?;
        api::verify_amount("precio_estimado", self.precio_estimado, api::max_price())?;
        api::verify_amount("anticipo", Some(self.anticipo), api::max_price())?;
        api::verify_amount("precio_final", self.precio_final, api::max_price())
    }
}

#[utoipa::path(
    post,
    path = "/ordenes",
    tag = ORDEN_TAG,
    request_body = OrdenCreateBody,
    responses(
        (status = 201, body = OrdenInfo),
        (status = 400, description = "A field is invalid or references don't match"),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
        (status = 404, description = "A referenced record does not exist"),
    ),
)]
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Json(body): Json<OrdenCreateBody>,
) -> ApiResult<(StatusCode, Json<OrdenInfo>)> {
    api::verify_role(&client, FRONT_DESK)?;

    let body = body.normalized();
    body.validate()?;
    let references = References {
        cliente_id: body.cliente_id,
        sucursal_id: body.sucursal_id,
        categoria_id: body.categoria_id,
        subcategoria_id: body.subcategoria_id,
    };

    let now = DateTime::now();
    let info = state.get_connection()?.transaction(|conn| {
        references.verify(conn)?;
        if let Some(tecnico_id) = body.tecnico_asignado_id {
            verify_technician(conn, tecnico_id)?;
        }

        let folio = next_folio(conn, now.year())?;
        let new_orden = NewOrdenTrabajo {
            folio: &folio,
            cliente_id: body.cliente_id,
            sucursal_id: body.sucursal_id,
            categoria_id: body.categoria_id,
            subcategoria_id: body.subcategoria_id,
            usuario_recepcion_id: client.id,
            tecnico_asignado_id: body.tecnico_asignado_id,
            descripcion: &body.descripcion,
            observaciones: body.observaciones.as_deref(),
            nombre_contacto_notificacion: body.nombre_contacto_notificacion.as_deref(),
            telefono_contacto_notificacion: body.telefono_contacto_notificacion.as_deref(),
            tipo_permiso: body.tipo_permiso,
            numero_permiso: body.numero_permiso.as_deref(),
            precio_estimado: body.precio_estimado,
            anticipo: body.anticipo,
            precio_final: body.precio_final,
            estatus: EstadoOrden::Recibido,
            prioridad: body.prioridad,
            fecha_promesa: body.fecha_promesa,
        };
        let orden = new_orden
            .insert_into(orden_trabajo::table)
            .returning(OrdenTrabajo::as_returning())
            .get_result(conn);
        let mut orden = api::error::map_unique_violation(orden, ResourceProperty::Folio)?;
        if body.estatus != EstadoOrden::Recibido {
            board::change_status(&mut orden, body.estatus, None, now);
            orden = orden.save_changes(conn)?;
        }

        tracing::info!("Created work order {} for client {}", orden.folio, orden.cliente_id);
        OrdenInfo::new(conn, orden).map_err(ApiError::from)
    })?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// Request body for updating a work order. Only provided fields are changed and
/// `null` or blank text clears an optional field. Technicians can only change
/// the description, the observations and the status.
#[derive(Default, Deserialize, ToSchema)]
struct OrdenUpdateBody {
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i64>)]
    sucursal_id: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i64>)]
    categoria_id: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i64>)]
    subcategoria_id: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i64>)]
    tecnico_asignado_id: Option<Option<i64>>,
    descripcion: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    observaciones: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    nombre_contacto_notificacion: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    telefono_contacto_notificacion: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<TipoPermiso>)]
    tipo_permiso: Option<Option<TipoPermiso>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    numero_permiso: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Decimal>)]
    precio_estimado: Option<Option<Decimal>>,
    anticipo: Option<Decimal>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Decimal>)]
    precio_final: Option<Option<Decimal>>,
    estatus: Option<EstadoOrden>,
    prioridad: Option<Prioridad>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<DateTime>)]
    fecha_promesa: Option<Option<DateTime>>,
}

impl OrdenUpdateBody {
    fn normalized(self) -> Self {
        let clear_blank = |value: Option<Option<String>>| value.map(api::non_blank);
        Self {
            descripcion: self.descripcion.map(|descripcion| descripcion.trim().to_owned()),
            observaciones: clear_blank(self.observaciones),
            nombre_contacto_notificacion: clear_blank(self.nombre_contacto_notificacion),
            telefono_contacto_notificacion: clear_blank(self.telefono_contacto_notificacion),
            numero_permiso: clear_blank(self.numero_permiso),
            ..self
        }
    }

    /// Drops every change a technician isn't allowed to make.
    fn restricted_to_technician(self) -> Self {
        Self {
            descripcion: self.descripcion,
            observaciones: self.observaciones,
            estatus: self.estatus,
            ..Self::default()
        }
    }

    fn validate(&self) -> ApiResult<()> {
        OrdenText {
            descripcion: self.descripcion.as_deref(),
            nombre_contacto_notificacion: api::new_value(&self.nombre_contacto_notificacion),
            telefono_contacto_notificacion: api::new_value(&self.telefono_contacto_notificacion),
            numero_permiso: api::new_value(&self.numero_permiso),
        }
        .validate()?;
        api::verify_amount("precio_estimado", self.precio_estimado.flatten(), api::max_price())?;
        api::verify_amount("anticipo", self.anticipo, api::max_price())?;
        api::verify_amount("precio_final", self.precio_final.flatten(), api::max_price())
    }

    /// Applies every change except the status, which has its own lifecycle.
    fn apply(self, orden: &mut OrdenTrabajo) {
        let body = self;
        api::set!(
            body, orden;
            sucursal_id,
            categoria_id,
            subcategoria_id,
            tecnico_asignado_id,
            descripcion,
            observaciones,
            nombre_contacto_notificacion,
            telefono_contacto_notificacion,
            tipo_permiso,
            numero_permiso,
            precio_estimado,
            anticipo,
            precio_final,
            prioridad,
            fecha_promesa
        );
    }
}

#[utoipa::path(
    put,
    path = "/ordenes/{id}",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Work order id")),
    request_body = OrdenUpdateBody,
    responses(
        (status = 200, body = OrdenInfo),
        (status = 400, description = "A field is invalid or references don't match"),
        (status = 403, description = "Technicians can only update their own orders"),
        (status = 404, description = "Work order or a referenced record does not exist"),
    ),
)]
async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(orden_id): Path<i64>,
    Json(body): Json<OrdenUpdateBody>,
) -> ApiResult<Json<OrdenInfo>> {
    api::verify_role(&client, STAFF)?;

    let body = body.normalized();
    let body = if client.rol == Rol::Tecnico {
        body.restricted_to_technician()
    } else {
        body
    };
    body.validate()?;

    state.get_connection()?.transaction(|conn| {
        let mut orden = find_orden(conn, orden_id)?;
        verify_assigned(&client, &orden, "modificar esta orden")?;
        if let Some(Some(tecnico_id)) = body.tecnico_asignado_id
            && orden.tecnico_asignado_id != Some(tecnico_id)
        {
            verify_technician(conn, tecnico_id)?;
        }

        let now = DateTime::now();
        let estatus = body.estatus;
        body.apply(&mut orden);
        if let Some(estatus) = estatus {
            board::change_status(&mut orden, estatus, None, now);
        }
        orden.updated_at = now;
        References::of(&orden).verify(conn)?;

        let orden: OrdenTrabajo = orden.save_changes(conn)?;
        OrdenInfo::new(conn, orden).map(Json).map_err(ApiError::from)
    })
}

#[derive(Deserialize, ToSchema)]
struct EstadoBody {
    estatus: EstadoOrden,
    /// Note appended to the order's observations.
    observaciones: Option<String>,
}

/// Changes the status of a work order, stamping the lifecycle date of the new status.
#[utoipa::path(
    patch,
    path = "/ordenes/{id}/estado",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Work order id")),
    request_body = EstadoBody,
    responses(
        (status = 200, body = OrdenInfo),
        (status = 403, description = "Technicians can only update their own orders"),
        (status = 404, description = "Work order does not exist"),
    ),
)]
async fn change_status(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(orden_id): Path<i64>,
    Json(body): Json<EstadoBody>,
) -> ApiResult<Json<OrdenInfo>> {
    api::verify_role(&client, STAFF)?;

    state.get_connection()?.transaction(|conn| {
        let mut orden = find_orden(conn, orden_id)?;
        verify_assigned(&client, &orden, "modificar esta orden")?;

        let previous = orden.estatus;
        board::change_status(&mut orden, body.estatus, body.observaciones.as_deref(), DateTime::now());
        let orden: OrdenTrabajo = orden.save_changes(conn)?;
        tracing::info!("Work order {} moved from {previous} to {}", orden.folio, orden.estatus);
        OrdenInfo::new(conn, orden).map(Json).map_err(ApiError::from)
    })
}

#[derive(Deserialize, ToSchema)]
struct TableroBody {
    /// Column the order was dropped on, identified by its status.
    columna: EstadoOrden,
}

/// Moves a work order to a column of the status board. Dropping an order on
/// the column it's already shown in leaves it unchanged.
#[utoipa::path(
    patch,
    path = "/ordenes/{id}/tablero",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Work order id")),
    request_body = TableroBody,
    responses(
        (status = 200, body = OrdenInfo),
        (status = 400, description = "Status is not a board column"),
        (status = 403, description = "Technicians can only update their own orders"),
        (status = 404, description = "Work order does not exist"),
    ),
)]
async fn move_on_board(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(orden_id): Path<i64>,
    Json(body): Json<TableroBody>,
) -> ApiResult<Json<OrdenInfo>> {
    api::verify_role(&client, STAFF)?;
    if !board::COLUMNS.contains(&body.columna) {
        return Err(ApiError::InvalidBoardColumn(body.columna));
    }

    state.get_connection()?.transaction(|conn| {
        let mut orden = find_orden(conn, orden_id)?;
        verify_assigned(&client, &orden, "modificar esta orden")?;

        if let Some(estatus) = board::drop_target(orden.estatus, body.columna) {
            board::change_status(&mut orden, estatus, None, DateTime::now());
            orden = orden.save_changes(conn)?;
        }
        OrdenInfo::new(conn, orden).map(Json).map_err(ApiError::from)
    })
}

#[derive(Clone, Copy, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
enum FotoTipo {
    Entrada,
    Salida,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct FotoParams {
    /// Either `entrada` or `salida`.
    tipo: String,
}

/// Multipart form of a photo upload.
#[derive(ToSchema)]
#[allow(dead_code)]
struct FotoForm {
    /// Image file, at most `max_upload_size` bytes.
    file: String,
}

#[derive(Serialize, ToSchema)]
struct FotoResponse {
    message: &'static str,
    /// Path the photo is served from.
    url: String,
}

/// Uploads the entry or exit photo of a work order.
///
/// Entry photos are also appended to the order's photo list.
#[utoipa::path(
    post,
    path = "/ordenes/{id}/foto",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Work order id"), FotoParams),
    request_body(content = FotoForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = FotoResponse),
        (status = 400, description = "Type is invalid or no file was sent"),
        (status = 404, description = "Work order does not exist"),
        (status = 413, description = "File is too large"),
        (status = 415, description = "File is not an image"),
    ),
)]
async fn upload_photo(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(orden_id): Path<i64>,
    Query(params): Query<FotoParams>,
    Multipart(mut form_data): Multipart,
) -> ApiResult<Json<FotoResponse>> {
    api::verify_role(&client, STAFF)?;
    let tipo: FotoTipo = params.tipo.parse().map_err(|_| ApiError::InvalidPhotoType)?;

    let folio = {
        let mut conn = state.get_connection()?;
        let orden = find_orden(&mut conn, orden_id)?;
        verify_assigned(&client, &orden, "modificar esta orden")?;
        orden.folio
    };

    let upload = read_photo(&mut form_data, state.config.max_upload_size).await?;
    let tipo_name: &'static str = tipo.into();
    let file_name = format!(
        "{folio}_{tipo_name}_{}_{}",
        DateTime::now().to_file_stamp(),
        sanitize_file_name(&upload.file_name)
    );
    let directory = state.config.order_photo_dir();
    tokio::fs::create_dir_all(&directory).await?;
    let temp_path = filesystem::temporary_photo_path(&state.config, &file_name);
    tokio::fs::write(&temp_path, &upload.data).await?;
    let url = filesystem::photo_url(&file_name);

    filesystem::commit_photo(&temp_path, &directory.join(&file_name), |rename| {
        state.get_connection()?.transaction(|conn| {
            let mut orden = find_orden(conn, orden_id)?;
            match tipo {
                FotoTipo::Entrada => {
                    NewFotoEntrada {
                        orden_trabajo_id: orden.id,
                        url: &url,
                    }
                    .insert_into(orden_foto_entrada::table)
                    .execute(conn)?;
                    orden.foto_entrada = Some(url.clone());
                }
                FotoTipo::Salida => orden.foto_salida = Some(url.clone()),
            }
            orden.updated_at = DateTime::now();
            let _: OrdenTrabajo = orden.save_changes(conn)?;
            rename()?;
            Ok::<_, ApiError>(())
        })
    })?;

    tracing::info!("Stored {tipo_name} photo of work order {folio} as {file_name}");
    Ok(Json(FotoResponse {
        message: "Foto subida correctamente",
        url,
    }))
}

#[utoipa::path(
    delete,
    path = "/ordenes/{id}",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Work order id")),
    responses(
        (status = 204),
        (status = 400, description = "Order is no longer RECIBIDO"),
        (status = 403, description = "Requires ADMIN"),
        (status = 404, description = "Work order does not exist"),
    ),
)]
async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(orden_id): Path<i64>,
) -> ApiResult<StatusCode> {
    api::verify_role(&client, ADMIN)?;

    let (orden, fotos) = state.get_connection()?.transaction(|conn| {
        let orden = find_orden(conn, orden_id)?;
        if orden.estatus != EstadoOrden::Recibido {
            return Err(ApiError::OrderNotDeletable);
        }
        let fotos: Vec<String> = orden_foto_entrada::table
            .filter(orden_foto_entrada::orden_trabajo_id.eq(orden.id))
            .select(orden_foto_entrada::url)
            .load(conn)?;
        diesel::delete(orden_trabajo::table.find(orden.id)).execute(conn)?;
        Ok((orden, fotos))
    })?;

    let urls = fotos.iter().chain(&orden.foto_entrada).chain(&orden.foto_salida);
    filesystem::remove_photos(&state.config, urls.map(String::as_str));
    tracing::info!("Deleted work order {}", orden.folio);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, ToSchema)]
struct SubtareaCreateBody {
    /// Between 1 and 200 characters.
    titulo: String,
    descripcion: Option<String>,
    tecnico_asignado_id: Option<i64>,
    /// Position within the order. New subtasks go last by default.
    orden: Option<i32>,
    #[serde(default)]
    estado: EstadoSubtarea,
}

#[utoipa::path(
    post,
    path = "/ordenes/{id}/subtareas",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Work order id")),
    request_body = SubtareaCreateBody,
    responses(
        (status = 201, body = SubtareaInfo),
        (status = 400, description = "Title is invalid"),
        (status = 403, description = "Technicians can only update their own orders"),
        (status = 404, description = "Work order or technician does not exist"),
    ),
)]
async fn create_subtarea(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(orden_id): Path<i64>,
    Json(body): Json<SubtareaCreateBody>,
) -> ApiResult<(StatusCode, Json<SubtareaInfo>)> {
    api::verify_role(&client, STAFF)?;

    let titulo = body.titulo.trim();
    let descripcion = api::non_blank(body.descripcion);
    api::verify_length("titulo", titulo, 1, 200)?;

    let info = state.get_connection()?.transaction(|conn| {
        let orden = find_orden(conn, orden_id)?;
        verify_assigned(&client, &orden, "modificar esta orden")?;
        if let Some(tecnico_id) = body.tecnico_asignado_id {
            verify_technician(conn, tecnico_id)?;
        }

        let position = match body.orden {
            Some(position) => position,
            None => {
                let count: i64 = subtarea_orden::table
                    .filter(subtarea_orden::orden_trabajo_id.eq(orden.id))
                    .count()
                    .get_result(conn)?;
                i32::try_from(count).unwrap_or(i32::MAX)
            }
        };
        let new_subtarea = NewSubtarea {
            orden_trabajo_id: orden.id,
            titulo,
            descripcion: descripcion.as_deref(),
            tecnico_asignado_id: body.tecnico_asignado_id,
            estado: EstadoSubtarea::Pendiente,
            orden: position,
        };
        let mut subtarea: Subtarea = new_subtarea
            .insert_into(subtarea_orden::table)
            .returning(Subtarea::as_returning())
            .get_result(conn)?;
        if body.estado != EstadoSubtarea::Pendiente {
            board::change_subtask_status(&mut subtarea, body.estado, DateTime::now());
            subtarea = subtarea.save_changes(conn)?;
        }
        SubtareaInfo::new(conn, subtarea).map_err(ApiError::from)
    })?;
    Ok((StatusCode::CREATED, Json(info)))
}

#[derive(Deserialize, ToSchema)]
struct SubtareaUpdateBody {
    titulo: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    descripcion: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i64>)]
    tecnico_asignado_id: Option<Option<i64>>,
    orden: Option<i32>,
    estado: Option<EstadoSubtarea>,
}

#[utoipa::path(
    put,
    path = "/subtareas/{id}",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Subtask id")),
    request_body = SubtareaUpdateBody,
    responses(
        (status = 200, body = SubtareaInfo),
        (status = 400, description = "Title is invalid"),
        (status = 403, description = "Technicians can only update their own orders"),
        (status = 404, description = "Subtask or technician does not exist"),
    ),
)]
async fn update_subtarea(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(subtarea_id): Path<i64>,
    Json(body): Json<SubtareaUpdateBody>,
) -> ApiResult<Json<SubtareaInfo>> {
    api::verify_role(&client, STAFF)?;

    let titulo = body.titulo.map(|titulo| titulo.trim().to_owned());
    if let Some(titulo) = titulo.as_deref() {
        api::verify_length("titulo", titulo, 1, 200)?;
    }

    state.get_connection()?.transaction(|conn| {
        let mut subtarea: Subtarea = subtarea_orden::table
            .find(subtarea_id)
            .select(Subtarea::as_select())
            .first(conn)
            .optional()?
            .ok_or(ApiError::NotFound(ResourceType::Subtarea))?;
        let orden = find_orden(conn, subtarea.orden_trabajo_id)?;
        verify_assigned(&client, &orden, "modificar esta orden")?;
        if let Some(Some(tecnico_id)) = body.tecnico_asignado_id
            && subtarea.tecnico_asignado_id != Some(tecnico_id)
        {
            verify_technician(conn, tecnico_id)?;
        }

        let now = DateTime::now();
        if let Some(titulo) = titulo {
            subtarea.titulo = titulo;
        }
        if let Some(descripcion) = body.descripcion {
            subtarea.descripcion = api::non_blank(descripcion);
        }
        if let Some(tecnico_asignado_id) = body.tecnico_asignado_id {
            subtarea.tecnico_asignado_id = tecnico_asignado_id;
        }
        if let Some(position) = body.orden {
            subtarea.orden = position;
        }
        if let Some(estado) = body.estado {
            board::change_subtask_status(&mut subtarea, estado, now);
        }
        subtarea.updated_at = now;

        let subtarea: Subtarea = subtarea.save_changes(conn)?;
        SubtareaInfo::new(conn, subtarea).map(Json).map_err(ApiError::from)
    })
}

#[utoipa::path(
    delete,
    path = "/subtareas/{id}",
    tag = ORDEN_TAG,
    params(("id" = i64, Path, description = "Subtask id")),
    responses(
        (status = 204),
        (status = 403, description = "Requires ADMIN or RECEPCION"),
        (status = 404, description = "Subtask does not exist"),
    ),
)]
async fn delete_subtarea(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(subtarea_id): Path<i64>,
) -> ApiResult<StatusCode> {
    api::verify_role(&client, FRONT_DESK)?;

    let deleted = diesel::delete(subtarea_orden::table.find(subtarea_id)).execute(&mut state.get_connection()?)?;
    if deleted == 0 {
        return Err(ApiError::NotFound(ResourceType::Subtarea));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Records a work order points to, which must exist and agree with each other.
struct References {
    cliente_id: i64,
    sucursal_id: Option<i64>,
    categoria_id: Option<i64>,
    subcategoria_id: Option<i64>,
}

impl References {
    fn of(orden: &OrdenTrabajo) -> Self {
        Self {
            cliente_id: orden.cliente_id,
            sucursal_id: orden.sucursal_id,
            categoria_id: orden.categoria_id,
            subcategoria_id: orden.subcategoria_id,
        }
    }

    fn verify(&self, conn: &mut PgConnection) -> ApiResult<()> {
        let cliente_exists: bool = diesel::select(exists(cliente::table.find(self.cliente_id))).get_result(conn)?;
        if !cliente_exists {
            return Err(ApiError::NotFound(ResourceType::Cliente));
        }

        if let Some(sucursal_id) = self.sucursal_id {
            let owner: i64 = sucursal::table
                .find(sucursal_id)
                .select(sucursal::cliente_id)
                .first(conn)
                .optional()?
                .ok_or(ApiError::NotFound(ResourceType::Sucursal))?;
            if owner != self.cliente_id {
                return Err(ApiError::BranchMismatch);
            }
        }

        if let Some(categoria_id) = self.categoria_id {
            let categoria_exists: bool =
                diesel::select(exists(categoria_orden::table.find(categoria_id))).get_result(conn)?;
            if !categoria_exists {
                return Err(ApiError::NotFound(ResourceType::Categoria));
            }
        }

        if let Some(subcategoria_id) = self.subcategoria_id {
            let categoria_id: i64 = subcategoria_orden::table
                .find(subcategoria_id)
                .select(subcategoria_orden::categoria_id)
                .first(conn)
                .optional()?
                .ok_or(ApiError::NotFound(ResourceType::Subcategoria))?;
            if self.categoria_id != Some(categoria_id) {
                return Err(ApiError::SubcategoryMismatch);
            }
        }
        Ok(())
    }
}

/// Text fields of an order body, as they will be stored.
struct OrdenText<'a> {
    descripcion: Option<&'a str>,
    nombre_contacto_notificacion: Option<&'a str>,
    telefono_contacto_notificacion: Option<&'a str>,
    numero_permiso: Option<&'a str>,
}

impl OrdenText<'_> {
    fn validate(&self) -> ApiResult<()> {
        if let Some(descripcion) = self.descripcion {
            api::verify_min_length("descripcion", descripcion, 10)?;
        }
        api::verify_max_length("nombre_contacto_notificacion", self.nombre_contacto_notificacion, 200)?;
        api::verify_max_length("telefono_contacto_notificacion", self.telefono_contacto_notificacion, 15)?;
        api::verify_max_length("numero_permiso", self.numero_permiso, 50)
    }
}

fn find_orden(conn: &mut PgConnection, orden_id: i64) -> ApiResult<OrdenTrabajo> {
    orden_trabajo::table
        .find(orden_id)
        .select(OrdenTrabajo::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Orden))
}

/// Technicians can only act on the orders assigned to them.
fn verify_assigned(client: &Client, orden: &OrdenTrabajo, action: &'static str) -> ApiResult<()> {
    if client.rol == Rol::Tecnico && orden.tecnico_asignado_id != Some(client.id) {
        Err(ApiError::Forbidden(action))
    } else {
        Ok(())
    }
}

fn verify_technician(conn: &mut PgConnection, tecnico_id: i64) -> ApiResult<()> {
    let technician = usuario::table
        .filter(usuario::id.eq(tecnico_id))
        .filter(usuario::rol.eq(Rol::Tecnico));
    let is_technician: bool = diesel::select(exists(technician)).get_result(conn)?;
    is_technician
        .then_some(())
        .ok_or(ApiError::NotFound(ResourceType::Tecnico))
}

/// Assigns the next folio of `year`. The order table stays locked against
/// concurrent inserts until the transaction ends, so two orders can't be
/// given the same folio.
fn next_folio(conn: &mut PgConnection, year: i32) -> QueryResult<String> {
    diesel::sql_query("LOCK TABLE orden_trabajo IN SHARE ROW EXCLUSIVE MODE").execute(conn)?;
    let folios: Vec<String> = orden_trabajo::table
        .select(orden_trabajo::folio)
        .filter(orden_trabajo::folio.like(format!("{}%", folio::prefix(year))))
        .load(conn)?;
    Ok(folio::next(folios.iter().map(String::as_str), year))
}

struct Upload {
    file_name: String,
    data: Vec<u8>,
}

/// Reads the `file` field of a photo upload, rejecting anything that isn't an
/// image or is larger than `max_size` bytes.
async fn read_photo(form_data: &mut AxumMultipart, max_size: usize) -> ApiResult<Upload> {
    while let Some(mut field) = form_data.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let is_image = field
            .content_type()
            .is_some_and(|content_type| content_type.starts_with("image/"));
        if !is_image {
            return Err(ApiError::UnsupportedImage);
        }

        let file_name = field.file_name().unwrap_or_default().to_owned();
        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if data.len() + chunk.len() > max_size {
                return Err(ApiError::UploadTooLarge(max_size));
            }
            data.extend_from_slice(&chunk);
        }
        return Ok(Upload { file_name, data });
    }
    Err(ApiError::MissingFile)
}

/// Keeps the final path component of an uploaded file name, restricted to
/// characters that are safe on every filesystem.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let sanitized: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    match sanitized.trim_start_matches('.') {
        "" => String::from("foto"),
        sanitized => sanitized.to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;
    use axum::http::header::AUTHORIZATION;
    use crate::model::user::User;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{Value, json};
    use serial_test::{parallel, serial};

    #[test]
    fn file_names() {
        assert_eq!(sanitize_file_name("frente.jpg"), "frente.jpg");
        assert_eq!(sanitize_file_name("C:\\fotos\\mi foto (1).png"), "mifoto1.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..."), "foto");
        assert_eq!(sanitize_file_name(""), "foto");
    }

    #[test]
    fn photo_types() {
        assert!(matches!("entrada".parse::<FotoTipo>(), Ok(FotoTipo::Entrada)));
        assert!(matches!("salida".parse::<FotoTipo>(), Ok(FotoTipo::Salida)));
        assert!("lateral".parse::<FotoTipo>().is_err());
        assert_eq!(<&'static str>::from(FotoTipo::Salida), "salida");
    }

    #[test]
    fn create_body() {
        let body: OrdenCreateBody = serde_json::from_value(json!({
            "cliente_id": 3,
            "descripcion": "  Cambio de aceite y filtros  ",
            "observaciones": " ",
        }))
        .unwrap();
        let body = body.normalized();
        assert_eq!(body.descripcion, "Cambio de aceite y filtros");
        assert_eq!(body.observaciones, None);
        assert_eq!(body.estatus, EstadoOrden::Recibido);
        assert_eq!(body.prioridad, Prioridad::Normal);
        assert_eq!(body.anticipo, Decimal::ZERO);
        assert!(body.validate().is_ok());

        let short: OrdenCreateBody = serde_json::from_value(json!({"cliente_id": 3, "descripcion": "Revisar"})).unwrap();
        assert!(matches!(
            short.normalized().validate(),
            Err(ApiError::TooShort { field: "descripcion", min: 10 })
        ));

        let negative: OrdenCreateBody = serde_json::from_value(json!({
            "cliente_id": 3,
            "descripcion": "Cambio de aceite y filtros",
            "anticipo": -100.0,
        }))
        .unwrap();
        assert!(matches!(negative.validate(), Err(ApiError::NegativeAmount("anticipo"))));
    }

    #[test]
    fn technician_updates_are_restricted() {
        let body: OrdenUpdateBody = serde_json::from_value(json!({
            "descripcion": "Se cambió la bomba de agua",
            "estatus": "PROCESO",
            "precio_final": 1500.0,
            "tecnico_asignado_id": null,
        }))
        .unwrap();
        assert_eq!(body.tecnico_asignado_id, Some(None));

        let body = body.restricted_to_technician();
        assert_eq!(body.estatus, Some(EstadoOrden::Proceso));
        assert_eq!(body.precio_final, None);
        assert_eq!(body.tecnico_asignado_id, None);

        let mut orden = sample_orden();
        orden.tecnico_asignado_id = Some(7);
        body.apply(&mut orden);
        assert_eq!(orden.descripcion, "Se cambió la bomba de agua");
        assert_eq!(orden.tecnico_asignado_id, Some(7));
        assert_eq!(orden.estatus, EstadoOrden::Recibido);
    }

    #[test]
    fn update_clears_optional_fields() {
        let body: OrdenUpdateBody = serde_json::from_value(json!({
            "observaciones": "  ",
            "sucursal_id": null,
            "prioridad": "URGENTE",
        }))
        .unwrap();
        let mut orden = sample_orden();
        orden.observaciones = Some(String::from("Cliente espera llamada"));
        orden.sucursal_id = Some(4);
        body.normalized().apply(&mut orden);
        assert_eq!(orden.observaciones, None);
        assert_eq!(orden.sucursal_id, None);
        assert_eq!(orden.prioridad, Prioridad::Urgente);
    }

    #[test]
    fn assignment() {
        let mut orden = sample_orden();
        orden.tecnico_asignado_id = Some(5);
        let client = |id, rol| Client {
            id,
            username: String::from("usuario"),
            rol,
        };
        assert!(verify_assigned(&client(5, Rol::Tecnico), &orden, "ver esta orden").is_ok());
        assert!(verify_assigned(&client(1, Rol::Recepcion), &orden, "ver esta orden").is_ok());
        assert!(matches!(
            verify_assigned(&client(6, Rol::Tecnico), &orden, "ver esta orden"),
            Err(ApiError::Forbidden("ver esta orden"))
        ));
    }

    #[tokio::test]
    #[parallel]
    async fn requires_authentication() {
        let server = test_server();
        assert_eq!(server.get("/api/v1/ordenes").await.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(server.get("/api/v1/ordenes/tablero").await.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(server.get("/api/v1/categorias").await.status_code(), StatusCode::UNAUTHORIZED);
        let response = server
            .patch("/api/v1/ordenes/1/estado")
            .json(&json!({"estatus": "PROCESO"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn folios_follow_highest_of_year() {
        let Some(state) = database_state() else { return };
        let year = DateTime::now().year();
        let (admin, cliente) = seed(&state, |conn| {
            let admin = create_test_user(conn, "admin", Rol::Admin)?;
            let cliente = create_test_cliente(conn, "Ferretería Los Pinos")?;
            create_test_orden(conn, &folio::format(year, 41), &cliente, &admin, None)?;
            create_test_orden(conn, &folio::format(year - 1, 90), &cliente, &admin, None)?;
            Ok((admin, cliente))
        });

        let server = server_for(state);
        for sequence in [42, 43] {
            let response = server
                .post("/api/v1/ordenes")
                .add_header(AUTHORIZATION, token_for(&admin))
                .json(&json!({"cliente_id": cliente.id, "descripcion": "Cambio de aceite y filtros"}))
                .await;
            assert_eq!(response.status_code(), StatusCode::CREATED);
            let orden = response.json::<Value>();
            assert_eq!(orden["folio"], folio::format(year, sequence));
            assert_eq!(orden["estatus"], "RECIBIDO");
        }
    }

    #[tokio::test]
    #[serial]
    async fn technicians_only_see_assigned_orders() {
        let Some(state) = database_state() else { return };
        let (admin, tecnico, ordenes) = seed(&state, |conn| {
            let admin = create_test_user(conn, "admin", Rol::Admin)?;
            let tecnico = create_test_user(conn, "tecnico", Rol::Tecnico)?;
            let otro = create_test_user(conn, "otro_tecnico", Rol::Tecnico)?;
            let cliente = create_test_cliente(conn, "Ana")?;
            let ordenes = [
                create_test_orden(conn, "OT-2025-0001", &cliente, &admin, Some(&tecnico))?,
                create_test_orden(conn, "OT-2025-0002", &cliente, &admin, Some(&otro))?,
                create_test_orden(conn, "OT-2025-0003", &cliente, &admin, None)?,
            ];
            Ok((admin, tecnico, ordenes))
        });

        let server = server_for(state);
        let list = |user: &User, query: &str| {
            server
                .get(&format!("/api/v1/ordenes{query}"))
                .add_header(AUTHORIZATION, token_for(user))
        };
        let own = list(&tecnico, "").await.json::<Vec<Value>>();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0]["folio"], "OT-2025-0001");
        let others = list(&tecnico, &format!("?tecnico_id={}", ordenes[1].tecnico_asignado_id.unwrap())).await;
        assert!(others.json::<Vec<Value>>().is_empty());
        assert_eq!(list(&admin, "").await.json::<Vec<Value>>().len(), 3);

        let get = |orden: &OrdenTrabajo| {
            server
                .get(&format!("/api/v1/ordenes/{}", orden.id))
                .add_header(AUTHORIZATION, token_for(&tecnico))
        };
        assert_eq!(get(&ordenes[0]).await.status_code(), StatusCode::OK);
        assert_eq!(get(&ordenes[1]).await.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(get(&ordenes[2]).await.status_code(), StatusCode::FORBIDDEN);

        let board = server
            .get("/api/v1/ordenes/tablero")
            .add_header(AUTHORIZATION, token_for(&tecnico))
            .await
            .json::<Vec<Value>>();
        let visible: usize = board.iter().map(|column| column["ordenes"].as_array().unwrap().len()).sum();
        assert_eq!(visible, 1);
    }

    #[tokio::test]
    #[serial]
    async fn board_groups_by_column() {
        let Some(state) = database_state() else { return };
        let admin = seed(&state, |conn| {
            let admin = create_test_user(conn, "admin", Rol::Admin)?;
            let cliente = create_test_cliente(conn, "Ana")?;
            let statuses = [
                EstadoOrden::Recibido,
                EstadoOrden::Diagnostico,
                EstadoOrden::EnEspera,
                EstadoOrden::Pausa,
                EstadoOrden::Entregado,
            ];
            for (sequence, estatus) in (1..).zip(statuses) {
                let orden = create_test_orden(conn, &folio::format(2025, sequence), &cliente, &admin, None)?;
                diesel::update(orden_trabajo::table.find(orden.id))
                    .set(orden_trabajo::estatus.eq(estatus))
                    .execute(conn)?;
            }
            Ok(admin)
        });

        let board = server_for(state)
            .get("/api/v1/ordenes/tablero")
            .add_header(AUTHORIZATION, token_for(&admin))
            .await
            .json::<Vec<Value>>();
        let columns: Vec<(&str, Vec<&str>)> = board
            .iter()
            .map(|column| {
                let statuses = column["ordenes"].as_array().unwrap().iter();
                let statuses = statuses.map(|orden| orden["estatus"].as_str().unwrap()).collect();
                (column["estatus"].as_str().unwrap(), statuses)
            })
            .collect();
        assert_eq!(
            columns,
            [
                ("RECIBIDO", vec!["RECIBIDO"]),
                ("EN_ESPERA", vec!["EN_ESPERA"]),
                ("PROCESO", vec!["DIAGNOSTICO", "PAUSA"]),
                ("FINALIZADO", vec!["ENTREGADO"]),
            ]
        );
    }

    #[tokio::test]
    #[serial]
    async fn rejected_photos() {
        let Some(state) = database_state() else { return };
        let (admin, orden) = seed(&state, |conn| {
            let admin = create_test_user(conn, "admin", Rol::Admin)?;
            let cliente = create_test_cliente(conn, "Ana")?;
            let orden = create_test_orden(conn, "OT-2025-0001", &cliente, &admin, None)?;
            Ok((admin, orden))
        });

        let max_upload_size = state.config.max_upload_size;
        let server = server_for(state);
        let upload = |part: Part| {
            server
                .post(&format!("/api/v1/ordenes/{}/foto", orden.id))
                .add_query_param("tipo", "entrada")
                .add_header(AUTHORIZATION, token_for(&admin))
                .multipart(MultipartForm::new().add_part("file", part))
        };

        let text = Part::bytes(b"no es una imagen".as_slice()).file_name("notas.txt").mime_type("text/plain");
        let response = upload(text).await;
        assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(response.json::<Value>()["name"], "UnsupportedImage");

        let large = Part::bytes(vec![0xff; max_upload_size + 1]).file_name("grande.jpg").mime_type("image/jpeg");
        let response = upload(large).await;
        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.json::<Value>()["name"], "UploadTooLarge");
    }

    #[tokio::test]
    #[serial]
    async fn deleting_order_removes_photos() {
        let Some(state) = database_state() else { return };
        let (admin, orden) = seed(&state, |conn| {
            let admin = create_test_user(conn, "admin", Rol::Admin)?;
            let cliente = create_test_cliente(conn, "Ana")?;
            let orden = create_test_orden(conn, "OT-2025-0001", &cliente, &admin, None)?;
            Ok((admin, orden))
        });

        let server = server_for(state.clone());
        let mut paths = Vec::new();
        for tipo in ["entrada", "salida"] {
            let photo = Part::bytes(b"\xff\xd8\xff\xe0".as_slice()).file_name("frente.jpg").mime_type("image/jpeg");
            let response = server
                .post(&format!("/api/v1/ordenes/{}/foto", orden.id))
                .add_query_param("tipo", tipo)
                .add_header(AUTHORIZATION, token_for(&admin))
                .multipart(MultipartForm::new().add_part("file", photo))
                .await;
            assert_eq!(response.status_code(), StatusCode::OK);
            let url = response.json::<Value>()["url"].as_str().unwrap().to_owned();
            let path = filesystem::photo_path(&state.config, &url).unwrap();
            assert!(path.exists());
            assert!(!filesystem::temporary_photo_path(&state.config, &url[filesystem::ORDER_PHOTO_URL.len()..]).exists());
            paths.push(path);
        }

        let response = server
            .delete(&format!("/api/v1/ordenes/{}", orden.id))
            .add_header(AUTHORIZATION, token_for(&admin))
            .await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
        for path in paths {
            assert!(!path.exists(), "{}", path.display());
        }
    }

    #[tokio::test]
    #[serial]
    async fn failed_upload_leaves_no_file() {
        let Some(state) = database_state() else { return };
        let (admin, orden) = seed(&state, |conn| {
            let admin = create_test_user(conn, "admin", Rol::Admin)?;
            let cliente = create_test_cliente(conn, "Ana")?;
            let orden = create_test_orden(conn, "OT-2025-0777", &cliente, &admin, None)?;
            Ok((admin, orden))
        });
        // Rejects every photo row once the file is already on disk
        seed(&state, |conn| {
            diesel::sql_query("ALTER TABLE orden_foto_entrada ADD CONSTRAINT rechazar_fotos CHECK (false) NOT VALID")
                .execute(conn)
        });

        let directory = state.config.order_photo_dir();
        let server = server_for(state);
        let photo = Part::bytes(b"\xff\xd8\xff\xe0".as_slice()).file_name("frente.jpg").mime_type("image/jpeg");
        let response = server
            .post(&format!("/api/v1/ordenes/{}/foto", orden.id))
            .add_query_param("tipo", "entrada")
            .add_header(AUTHORIZATION, token_for(&admin))
            .multipart(MultipartForm::new().add_part("file", photo))
            .await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let leftovers = std::fs::read_dir(&directory)
            .into_iter()
            .flatten()
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().contains(&orden.folio))
            .count();
        assert_eq!(leftovers, 0);
    }
}
