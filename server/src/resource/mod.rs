use crate::schema::usuario;
use diesel::prelude::*;
use std::collections::HashMap;

pub mod cliente;
pub mod incidencia;
pub mod orden;
pub mod sucursal;
pub mod user;
pub mod vacaciones;

/// Retrieves the full names of the users in `ids`, keyed by id.
///
/// Responses show the names of technicians, receptionists and approvers next to
/// their ids. Loading them in one batch avoids a query per record.
fn user_names(conn: &mut PgConnection, ids: impl IntoIterator<Item = i64>) -> QueryResult<HashMap<i64, String>> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    usuario::table
        .select((usuario::id, usuario::nombre_completo))
        .filter(usuario::id.eq_any(ids))
        .load(conn)
        .map(|names: Vec<(i64, String)>| names.into_iter().collect())
}

/// Looks up the name of an optional user id in a map built by [`user_names`].
fn name_of(names: &HashMap<i64, String>, id: Option<i64>) -> Option<String> {
    id.and_then(|id| names.get(&id)).cloned()
}
