/// ANSI color helper utilities for terminal output.
use crate::models::status::Status;

pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const MAGENTA: &str = "\x1b[35m";

/// Color for an event status in listings.
pub fn color_for_status(status: Status) -> &'static str {
    match status {
        Status::Ok => GREEN,
        Status::Duplicate | Status::Cooldown => GREY,
        Status::RejectOutTooEarly | Status::RejectOutLate => YELLOW,
        Status::Unknown => MAGENTA,
        Status::Reject | Status::Error => RED,
    }
}

