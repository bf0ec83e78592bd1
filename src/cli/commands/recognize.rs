use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::service::AttendanceService;
use crate::errors::AppResult;
use std::fs;

/// `recognize` and `recognize-group`: the decision is printed as JSON.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Recognize {
            device,
            vector,
            face_px,
            at,
        } => {
            let now = super::parse_at(at.as_deref())?;
            let image = fs::read(vector)?;

            let mut pool = super::open_db(cfg)?;
            let service = AttendanceService::with_json_capabilities(cfg.clone());
            service.on_enrollment_changed(&pool.conn)?;

            let response = service.recognize_at(&mut pool.conn, &image, *face_px, device, now)?;
            super::print_json(&response)
        }

        Commands::RecognizeGroup { device, faces, at } => {
            let now = super::parse_at(at.as_deref())?;
            let image = fs::read(faces)?;

            let mut pool = super::open_db(cfg)?;
            let service = AttendanceService::with_json_capabilities(cfg.clone());
            service.on_enrollment_changed(&pool.conn)?;

            let response = service.recognize_group_at(&mut pool.conn, &image, device, now)?;
            super::print_json(&response)
        }

        _ => Ok(()),
    }
}
