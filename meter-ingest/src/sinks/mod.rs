pub mod questdb;
pub mod questdb_ilp;

pub use questdb::QuestDbSink;
pub use questdb_ilp::QuestDbIlpSink;
