pub mod daily;
pub mod event;
pub mod event_type;
pub mod person;
pub mod policy;
pub mod status;
