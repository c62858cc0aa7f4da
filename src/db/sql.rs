//! Column encodings shared by the query layer: closed enums stored as
//! lowercase text and money stored as integer cents.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;

use crate::models::{BookingStatus, EntryKind, InvoiceStatus, PaymentStatus, Role, VenueType};

macro_rules! text_enum_column {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let s = value.as_str()?;
                    <$ty>::parse(s).ok_or_else(|| {
                        FromSqlError::Other(format!("unknown {}: {s}", stringify!($ty)).into())
                    })
                }
            }
        )+
    };
}

text_enum_column!(
    Role,
    VenueType,
    BookingStatus,
    EntryKind,
    PaymentStatus,
    InvoiceStatus,
);

/// A monetary amount persisted as a signed count of cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cents(pub Decimal);

impl ToSql for Cents {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let mut scaled = self.0.round_dp(2);
        scaled.rescale(2);
        let cents = i64::try_from(scaled.mantissa())
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::from(cents))
    }
}

impl FromSql for Cents {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(Cents(Decimal::new(value.as_i64()?, 2)))
    }
}
