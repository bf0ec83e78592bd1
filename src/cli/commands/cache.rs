use crate::cli::parser::{CacheAction, Commands};
use crate::config::Config;
use crate::core::service::AttendanceService;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, RESET};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Cache {
        action: CacheAction::Rebuild,
    } = cmd
    {
        let pool = super::open_db(cfg)?;
        let service = AttendanceService::with_json_capabilities(cfg.clone());
        let generation = service.on_enrollment_changed(&pool.conn)?;

        println!("{}• Generation:{} {}", CYAN, RESET, generation.generation);
        println!("{}• Dimension:{} {}", CYAN, RESET, generation.dim());
        println!(
            "{}• Identities:{} {}{}{}",
            CYAN,
            RESET,
            GREEN,
            generation.len(),
            RESET
        );
        for name in generation.names() {
            println!("    - {}", name);
        }
    }
    Ok(())
}
