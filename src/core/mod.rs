pub mod capabilities;
pub mod correction;
pub mod engine;
pub mod enroll;
pub mod identity_cache;
pub mod locks;
pub mod log;
pub mod matcher;
pub mod policy_store;
pub mod retention;
pub mod service;
pub mod snapshots;
