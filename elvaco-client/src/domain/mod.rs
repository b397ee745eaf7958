pub mod metric;
pub mod point;
pub mod reading;
pub mod series;

pub use metric::{MetricKind, ReportColumn, SeriesClass};
pub use point::{Point, PointBatch, PointKind};
pub use reading::Reading;
pub use series::Series;
