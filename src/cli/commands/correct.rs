use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::service::AttendanceService;
use crate::errors::AppResult;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Correct {
        id,
        name,
        note,
        actor,
    } = cmd
    {
        let mut pool = super::open_db(cfg)?;
        let service = AttendanceService::with_json_capabilities(cfg.clone());
        let outcome = service.correct(&mut pool.conn, *id, name, note.as_deref(), actor)?;
        super::print_json(&outcome)?;
    }
    Ok(())
}
