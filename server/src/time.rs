use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Timestamptz;
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::Deref;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};
use utoipa::openapi::schema::{KnownFormat, ObjectBuilder, Schema, SchemaFormat, Type};
use utoipa::openapi::RefOr;

/// A wrapper for time::OffsetDateTime that serializes according to RFC 3339.
///
/// Deserialization is more lenient: besides RFC 3339 it accepts local date-times
/// such as `2025-03-01T10:30` and plain dates, both interpreted as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Timestamptz)]
pub struct DateTime(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

impl DateTime {
    pub fn now() -> Self {
        OffsetDateTime::now_utc().into()
    }

    pub fn today() -> Date {
        Self::now().date()
    }

    pub fn from_date(date: Date) -> Self {
        date.midnight().assume_utc().into()
    }

    /// Number of whole days elapsed between `self` and `later`.
    pub fn whole_days_until(self, later: Self) -> i64 {
        (later.0 - self.0).whole_days()
    }

    /// Formats as `YYYY-MM-DD HH:MM`.
    pub fn to_minute_string(self) -> String {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
        self.0
            .format(&format)
            .unwrap_or_else(|_| self.0.date().to_string())
    }

    /// Formats as `YYYYMMDD_HHMMSS`, for use in file names.
    pub fn to_file_stamp(self) -> String {
        let format = format_description!("[year][month][day]_[hour][minute][second]");
        self.0
            .format(&format)
            .unwrap_or_else(|_| self.0.unix_timestamp().to_string())
    }

    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(time) = OffsetDateTime::parse(input, &Rfc3339) {
            return Some(time.into());
        }

        let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
        let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
        let date_only = format_description!("[year]-[month]-[day]");
        PrimitiveDateTime::parse(input, &with_seconds)
            .or_else(|_| PrimitiveDateTime::parse(input, &without_seconds))
            .map(PrimitiveDateTime::assume_utc)
            .map(Self::from)
            .ok()
            .or_else(|| Date::parse(input, &date_only).ok().map(Self::from_date))
    }
}

impl Deref for DateTime {
    type Target = OffsetDateTime;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(value: OffsetDateTime) -> Self {
        DateTime(value)
    }
}

impl std::ops::Add<Duration> for DateTime {
    type Output = Self;
    fn add(self, rhs: Duration) -> Self::Output {
        DateTime(self.0 + rhs)
    }
}

impl std::ops::Sub<Duration> for DateTime {
    type Output = Self;
    fn sub(self, rhs: Duration) -> Self::Output {
        DateTime(self.0 - rhs)
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let input = String::deserialize(deserializer)?;
        Self::parse(&input).ok_or_else(|| serde::de::Error::custom(format!("'{input}' is not a valid date-time")))
    }
}

impl<DB: Backend> ToSql<Timestamptz, DB> for DateTime
where
    OffsetDateTime: ToSql<Timestamptz, DB>,
{
    fn to_sql<'a>(&'a self, out: &mut Output<'a, '_, DB>) -> serialize::Result {
        self.0.to_sql(out)
    }
}

impl<DB: Backend> FromSql<Timestamptz, DB> for DateTime
where
    OffsetDateTime: FromSql<Timestamptz, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        OffsetDateTime::from_sql(bytes).map(DateTime)
    }
}

impl utoipa::PartialSchema for DateTime {
    fn schema() -> RefOr<Schema> {
        let object = ObjectBuilder::new()
            .schema_type(Type::String)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime)))
            .build();
        RefOr::T(Schema::Object(object))
    }
}

impl utoipa::ToSchema for DateTime {}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn parse_formats() {
        let expected: DateTime = datetime!(2025-03-01 10:30 UTC).into();
        assert_eq!(DateTime::parse("2025-03-01T10:30:00Z"), Some(expected));
        assert_eq!(DateTime::parse("2025-03-01T10:30:00+00:00"), Some(expected));
        assert_eq!(DateTime::parse("2025-03-01T10:30"), Some(expected));
        assert_eq!(DateTime::parse("2025-03-01T10:30:00"), Some(expected));
        assert_eq!(DateTime::parse("2025-03-01"), Some(DateTime::from_date(date!(2025 - 03 - 01))));
        assert_eq!(DateTime::parse("01/03/2025"), None);
        assert_eq!(DateTime::parse(""), None);
    }

    #[test]
    fn json_round_trip() {
        let time: DateTime = datetime!(2024-12-24 18:05:09 UTC).into();
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, "\"2024-12-24T18:05:09Z\"");
        assert_eq!(serde_json::from_str::<DateTime>(&json).unwrap(), time);
    }

    #[test]
    fn minute_string() {
        let time: DateTime = datetime!(2025-01-07 08:04:59 UTC).into();
        assert_eq!(time.to_minute_string(), "2025-01-07 08:04");
    }

    #[test]
    fn whole_days() {
        let start: DateTime = datetime!(2025-01-01 12:00 UTC).into();
        assert_eq!(start.whole_days_until(start + Duration::hours(47)), 1);
        assert_eq!(start.whole_days_until(start + Duration::days(10)), 10);
        assert_eq!(start.whole_days_until(start), 0);
    }
}
