use crate::model::enums::{EstadoOrden, EstadoSubtarea};
use crate::model::orden::{OrdenTrabajo, Subtarea};
use crate::time::DateTime;

/// Columns of the status board, in display order. Each column is identified
/// by the status an order receives when dropped on it.
pub const COLUMNS: [EstadoOrden; 4] = [
    EstadoOrden::Recibido,
    EstadoOrden::EnEspera,
    EstadoOrden::Proceso,
    EstadoOrden::Finalizado,
];

/// Returns the board column an order with status `estatus` is shown in.
pub fn column_for(estatus: EstadoOrden) -> EstadoOrden {
    match estatus {
        EstadoOrden::Recibido => EstadoOrden::Recibido,
        EstadoOrden::EnEspera => EstadoOrden::EnEspera,
        EstadoOrden::Diagnostico | EstadoOrden::Proceso | EstadoOrden::Pausa | EstadoOrden::Revision => {
            EstadoOrden::Proceso
        }
        EstadoOrden::Terminado | EstadoOrden::Entregado | EstadoOrden::Finalizado => EstadoOrden::Finalizado,
    }
}

/// Status an order should receive when dropped on `column`, or `None` if the
/// drop leaves the order where it already is.
pub fn drop_target(current: EstadoOrden, column: EstadoOrden) -> Option<EstadoOrden> {
    (column_for(current) != column).then_some(column)
}

/// Sets the status of `orden`, stamping the lifecycle date that belongs to the
/// new status if it hasn't been stamped before. A non-empty `note` is appended
/// to the order's observations.
pub fn change_status(orden: &mut OrdenTrabajo, estatus: EstadoOrden, note: Option<&str>, now: DateTime) {
    orden.estatus = estatus;
    let lifecycle_date = match estatus {
        EstadoOrden::Proceso => Some(&mut orden.fecha_inicio_trabajo),
        EstadoOrden::Terminado => Some(&mut orden.fecha_terminado),
        EstadoOrden::Entregado => Some(&mut orden.fecha_entrega),
        _ => None,
    };
    if let Some(date) = lifecycle_date {
        date.get_or_insert(now);
    }

    if let Some(note) = note.map(str::trim).filter(|note| !note.is_empty()) {
        orden.observaciones = Some(append_observation(orden.observaciones.as_deref(), note, now));
    }
    orden.updated_at = now;
}

/// Sets the status of `subtarea`. Starting work and completing it are each
/// stamped the first time they happen.
pub fn change_subtask_status(subtarea: &mut Subtarea, estado: EstadoSubtarea, now: DateTime) {
    subtarea.estado = estado;
    match estado {
        EstadoSubtarea::EnProceso => {
            subtarea.fecha_inicio.get_or_insert(now);
        }
        EstadoSubtarea::Completada => {
            subtarea.fecha_completada.get_or_insert(now);
        }
        EstadoSubtarea::Pendiente | EstadoSubtarea::Cancelada => (),
    }
    subtarea.updated_at = now;
}

/// Appends `note` to `existing` observations as `[YYYY-MM-DD HH:MM] note`,
/// separated from previous text by a blank line.
pub fn append_observation(existing: Option<&str>, note: &str, now: DateTime) -> String {
    let entry = format!("[{}] {note}", now.to_minute_string());
    match existing.map(str::trim_end).filter(|text| !text.is_empty()) {
        Some(text) => format!("{text}\n\n{entry}"),
        None => entry,
    }
}
