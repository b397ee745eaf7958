use serde::{Deserialize, Deserializer};
use time::OffsetDateTime;

/// One sample of a series, as returned by the `mdmdata` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Null on non-numeric samples; decoded as 0.0 so the page still parses.
    #[serde(alias = "Value", default, deserialize_with = "null_as_zero")]
    pub value: f64,
    #[serde(alias = "EffectiveDate", deserialize_with = "from_epoch_millis")]
    pub effective_date: OffsetDateTime,
    #[serde(alias = "Status", default)]
    pub status: i32,
    #[serde(alias = "Numeric", default)]
    pub numeric: bool,
}

impl Reading {
    /// Status 0 is "valid data"; anything else, or a non-numeric sample, is dropped.
    pub fn is_valid(&self) -> bool {
        self.status == 0 && self.numeric
    }
}

pub fn epoch_millis(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000_000) as i64
}

fn null_as_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or_default())
}

fn from_epoch_millis<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
    let millis = i64::deserialize(d)?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(serde::de::Error::custom)
}
