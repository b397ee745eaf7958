pub mod elvaco_daily;

pub use elvaco_daily::ElvacoDailySource;
