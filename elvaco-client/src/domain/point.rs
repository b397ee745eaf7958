use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// One valid reading, stamped at its own instant.
    Raw,
    /// Consumption over one full day, stamped at the start of the day.
    DailyDelta,
}

/// A numeric sample bound for the time-series store.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub ts: OffsetDateTime,
    pub metric: String,
    pub house: String,
    pub value: f64,
    pub kind: PointKind,
}

/// All points produced for one series over one day window. Written as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBatch {
    pub series_id: i64,
    pub day: OffsetDateTime,
    pub points: Vec<Point>,
}

impl PointBatch {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}
