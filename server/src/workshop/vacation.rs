//! Vacation entitlement following the 2023 reform of the Ley Federal del Trabajo.

use crate::model::enums::{EstadoSolicitud, TipoSolicitud};
use rust_decimal::Decimal;
use time::{Date, Month};

/// Hours in a working day, used to convert hour-based requests to days.
const HOURS_PER_DAY: i64 = 8;

/// Vacation days granted for a year of service after `years` completed years.
///
/// One year grants 12 days and each further year adds 2 up to 20 days at five
/// years. From then on, every additional five years add 2 more days.
pub fn entitled_days(years: i32) -> i64 {
    match years {
        ..=0 => 0,
        1..=5 => 10 + 2 * i64::from(years),
        _ => 22 + 2 * i64::from((years - 6) / 5),
    }
}

/// Completed years of service on `today` for an employee hired on `fecha_ingreso`.
pub fn years_of_service(fecha_ingreso: Date, today: Date) -> i32 {
    let years = today.year() - fecha_ingreso.year();
    if anniversary(fecha_ingreso, today.year()) > today {
        years - 1
    } else {
        years
    }
}

/// Start of the service year containing `today`: the most recent hiring anniversary.
pub fn service_year_start(fecha_ingreso: Date, today: Date) -> Date {
    let this_year = anniversary(fecha_ingreso, today.year());
    if this_year > today {
        anniversary(fecha_ingreso, today.year() - 1)
    } else {
        this_year
    }
}

/// Number of calendar days from `inicio` through `fin`, both included.
pub fn inclusive_days(inicio: Date, fin: Date) -> i64 {
    (fin - inicio).whole_days().abs() + 1
}

/// Vacation days consumed by a request of `cantidad` units of `tipo`.
pub fn day_equivalent(tipo: TipoSolicitud, cantidad: Decimal) -> Decimal {
    match tipo {
        TipoSolicitud::DiasCompletos => cantidad,
        TipoSolicitud::MedioDia => cantidad / Decimal::TWO,
        TipoSolicitud::Horas => cantidad / Decimal::from(HOURS_PER_DAY),
    }
}

/// The parts of a vacation request that affect an employee's balance.
pub struct RequestSummary {
    pub fecha_inicio: Date,
    pub tipo: TipoSolicitud,
    pub cantidad: Decimal,
    pub estado: EstadoSolicitud,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Balance {
    pub years_of_service: i32,
    pub service_year_start: Date,
    /// Days granted for the current service year.
    pub granted: Decimal,
    /// Days carried over from previous years.
    pub carried_over: Decimal,
    /// Days consumed by approved or taken requests in the current service year.
    pub taken: Decimal,
    pub available: Decimal,
}

/// Computes an employee's vacation balance on `today`. Returns [`None`] if the
/// day counts are too large to be added up.
///
/// Without a hiring date no days are granted and the service year is the calendar year.
pub fn balance(
    fecha_ingreso: Option<Date>,
    carried_over: Decimal,
    requests: &[RequestSummary],
    today: Date,
) -> Option<Balance> {
    let (years, start, end) = match fecha_ingreso {
        Some(fecha_ingreso) => {
            let start = service_year_start(fecha_ingreso, today);
            let end = anniversary(fecha_ingreso, start.year() + 1);
            (years_of_service(fecha_ingreso, today), start, end)
        }
        None => {
            let start = calendar_year_start(today);
            (0, start, calendar_year_start_of(today.year() + 1).unwrap_or(start))
        }
    };
    let granted = Decimal::from(entitled_days(years));
    let taken = requests
        .iter()
        .filter(|request| request.estado.consumes_days())
        .filter(|request| request.fecha_inicio >= start && request.fecha_inicio < end)
        .try_fold(Decimal::ZERO, |sum, request| {
            sum.checked_add(day_equivalent(request.tipo, request.cantidad))
        })?;
    let available = granted.checked_add(carried_over)?.checked_sub(taken)?;

    Some(Balance {
        years_of_service: years,
        service_year_start: start,
        granted,
        carried_over,
        taken,
        available: available.max(Decimal::ZERO),
    })
}

/// Anniversary of `date` in `year`. Employees hired on February 29th
/// celebrate on February 28th in common years.
fn anniversary(date: Date, year: i32) -> Date {
    date.replace_year(year)
        .or_else(|_| Date::from_calendar_date(year, Month::February, 28))
        .unwrap_or(date)
}

fn calendar_year_start(today: Date) -> Date {
    calendar_year_start_of(today.year()).unwrap_or(today)
}

fn calendar_year_start_of(year: i32) -> Option<Date> {
    Date::from_calendar_date(year, Month::January, 1).ok()
}
