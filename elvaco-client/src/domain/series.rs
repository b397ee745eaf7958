use serde::Deserialize;

/// Identifier suffix of channels that carry real data. Other suffixes (e.g.
/// `0.0.0.3` on volume flow and power) report the sentinel value 999999.
pub const VALID_IDENTIFIER_SUFFIX: &str = "0.0.0.0";

/// One metering channel as listed by `viewmdmserie/all`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Series {
    #[serde(alias = "MeasurementSerieId")]
    pub measurement_serie_id: i64,
    #[serde(alias = "SourcePosition")]
    pub source_position: String,
    #[serde(alias = "UnitString")]
    pub unit_string: String,
    #[serde(alias = "UnitTypeString")]
    pub unit_type_string: String,
    #[serde(alias = "DeviceTypeString")]
    pub device_type_string: String,
    #[serde(alias = "ApiIdentifier")]
    pub api_identifier: String,
    #[serde(alias = "Name")]
    pub name: Option<String>,
    #[serde(alias = "Description")]
    pub description: Option<String>,
    #[serde(alias = "SourceIdentifier")]
    pub source_identifier: Option<String>,
    #[serde(alias = "SourceType")]
    pub source_type: Option<String>,
    #[serde(alias = "SourceId")]
    pub source_id: Option<i64>,
    #[serde(alias = "DeviceTypeId")]
    pub device_type_id: Option<i64>,
    #[serde(alias = "UnitTypeId")]
    pub unit_type_id: Option<i64>,
    #[serde(alias = "UnitId")]
    pub unit_id: Option<i64>,
}

impl Series {
    /// `{deviceType}_{unitType}_{unit}`, the name points are written under.
    pub fn metric_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.device_type_string, self.unit_type_string, self.unit_string
        )
    }

    pub fn has_unit(&self) -> bool {
        !self.unit_string.is_empty()
    }

    pub fn has_valid_identifier(&self) -> bool {
        self.api_identifier.ends_with(VALID_IDENTIFIER_SUFFIX)
    }
}
