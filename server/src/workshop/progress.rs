use crate::model::enums::{EstadoOrden, EstadoSubtarea};
use crate::model::orden::OrdenTrabajo;
use crate::time::DateTime;
use rust_decimal::Decimal;

/// Days elapsed since the order was received, counting up to delivery if it was delivered.
pub fn dias_desde_recepcion(orden: &OrdenTrabajo, now: DateTime) -> i64 {
    let end = orden.fecha_entrega.unwrap_or(now);
    orden.fecha_recepcion.whole_days_until(end)
}

/// An order runs late when its promised date has passed while it is still open.
pub fn esta_retrasada(estatus: EstadoOrden, fecha_promesa: Option<DateTime>, now: DateTime) -> bool {
    !estatus.is_closed() && fecha_promesa.is_some_and(|promesa| now > promesa)
}

/// Amount still owed by the client. Zero until a final price is agreed.
/// Returns [`None`] if the difference can't be represented.
pub fn saldo_pendiente(precio_final: Option<Decimal>, anticipo: Decimal) -> Option<Decimal> {
    match precio_final {
        Some(precio) => precio.checked_sub(anticipo),
        None => Some(Decimal::ZERO),
    }
}

/// Percentage of subtasks completed, rounded down. Zero when there are no subtasks.
pub fn porcentaje_completado(subtareas: impl IntoIterator<Item = EstadoSubtarea>) -> i32 {
    let (total, completed) = subtareas.into_iter().fold((0, 0), |(total, completed), estado| {
        (total + 1, completed + i32::from(estado == EstadoSubtarea::Completada))
    });
    if total == 0 { 0 } else { completed * 100 / total }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::sample_orden;
    use time::Duration;
    use time::macros::datetime;

    #[test]
    fn days_since_reception() {
        let now: DateTime = datetime!(2025-03-10 12:00 UTC).into();
        let mut orden = sample_orden();
        orden.fecha_recepcion = now - Duration::hours(80);
        assert_eq!(dias_desde_recepcion(&orden, now), 3);

        orden.fecha_entrega = Some(orden.fecha_recepcion + Duration::days(1));
        assert_eq!(dias_desde_recepcion(&orden, now), 1);
    }

    #[test]
    fn late_orders() {
        let now: DateTime = datetime!(2025-03-10 12:00 UTC).into();
        let yesterday = Some(now - Duration::days(1));
        let tomorrow = Some(now + Duration::days(1));
        assert!(esta_retrasada(EstadoOrden::Proceso, yesterday, now));
        assert!(esta_retrasada(EstadoOrden::Terminado, yesterday, now));
        assert!(!esta_retrasada(EstadoOrden::Proceso, tomorrow, now));
        assert!(!esta_retrasada(EstadoOrden::Proceso, None, now));
        assert!(!esta_retrasada(EstadoOrden::Entregado, yesterday, now));
        assert!(!esta_retrasada(EstadoOrden::Finalizado, yesterday, now));
    }

    #[test]
    fn balance() {
        let anticipo = Decimal::from(500);
        assert_eq!(saldo_pendiente(None, anticipo), Some(Decimal::ZERO));
        assert_eq!(saldo_pendiente(Some(Decimal::new(180_050, 2)), anticipo), Some(Decimal::new(130_050, 2)));
        assert_eq!(saldo_pendiente(Some(Decimal::MIN), anticipo), None);
    }

    #[test]
    fn completion() {
        use EstadoSubtarea::*;
        assert_eq!(porcentaje_completado(Vec::<EstadoSubtarea>::new()), 0);
        assert_eq!(porcentaje_completado([Completada, Pendiente, EnProceso]), 33);
        assert_eq!(porcentaje_completado([Completada, Completada, Cancelada, Pendiente]), 50);
        assert_eq!(porcentaje_completado([Completada]), 100);
    }
}
