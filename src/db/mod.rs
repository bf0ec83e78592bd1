pub mod features;
pub mod initialize;
pub mod log;
pub mod migrate;
pub mod policy;
pub mod pool;
pub mod queries;
pub mod stats;
