use super::Series;

/// What a channel's unit measures. Energy and volume are monotonic counters and
/// therefore the only kinds that get daily-delta aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Energy,
    Volume,
    Other,
}

impl MetricKind {
    pub fn from_unit(unit: &str) -> Self {
        if unit.ends_with("Wh") {
            MetricKind::Energy
        } else if unit.ends_with("m3") {
            MetricKind::Volume
        } else {
            MetricKind::Other
        }
    }

    pub fn is_cumulative(self) -> bool {
        matches!(self, MetricKind::Energy | MetricKind::Volume)
    }
}

/// Column of the usage report a metric feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportColumn {
    Electricity,
    Heat,
    ColdWater,
    HotWater,
}

impl ReportColumn {
    pub fn from_metric_name(name: &str) -> Option<Self> {
        match name {
            "electricity_energy_kWh" => Some(ReportColumn::Electricity),
            "heat_energy_Wh" => Some(ReportColumn::Heat),
            "water_volume_m3" => Some(ReportColumn::ColdWater),
            "warm water (30°C-90°C)_volume_m3" => Some(ReportColumn::HotWater),
            _ => None,
        }
    }

    /// Converts a raw counter difference into the unit the report is printed in.
    pub fn to_report_unit(self, raw: f64) -> f64 {
        match self {
            // heat meters count Wh, the report shows kWh
            ReportColumn::Heat => raw / 1000.0,
            _ => raw,
        }
    }
}

/// Classification of a series, computed once when the series is picked up.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesClass {
    pub metric: String,
    pub kind: MetricKind,
    pub report_column: Option<ReportColumn>,
}

impl SeriesClass {
    pub fn of(series: &Series) -> Self {
        let metric = series.metric_name();
        Self {
            kind: MetricKind::from_unit(&series.unit_string),
            report_column: ReportColumn::from_metric_name(&metric),
            metric,
        }
    }
}
