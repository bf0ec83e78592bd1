use crate::cli::parser::{Commands, PolicyAction};
use crate::config::Config;
use crate::core::policy_store::PolicyStore;
use crate::errors::AppResult;
use crate::models::policy::PolicyPatch;
use crate::ui::messages::success;
use crate::utils::colors::{CYAN, GREY, RESET};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Policy { action } = cmd else {
        return Ok(());
    };
    let mut pool = super::open_db(cfg)?;
    let store = PolicyStore::default();

    match action {
        PolicyAction::Show { json } => {
            let row = store.get_row(&pool.conn)?;
            if *json {
                return super::print_json(&row);
            }
            let out_end = match &row.out_end_time {
                Some(t) => t.clone(),
                None => format!("{GREY}none{RESET}"),
            };
            println!("{}• Timezone:{}        {}", CYAN, RESET, row.timezone);
            println!("{}• IN start:{}        {}", CYAN, RESET, row.in_start_time);
            println!("{}• Late after:{}      {}", CYAN, RESET, row.late_after_time);
            println!("{}• OUT start:{}       {}", CYAN, RESET, row.out_start_time);
            println!("{}• OUT end:{}         {}", CYAN, RESET, out_end);
            println!("{}• Cooldown:{}        {} s", CYAN, RESET, row.cooldown_seconds);
            println!("{}• Retention:{}       {} days", CYAN, RESET, row.retention_days);
            println!("{}• Updated at:{}      {}", CYAN, RESET, row.updated_at);
        }

        PolicyAction::Set {
            timezone,
            in_start,
            late_after,
            out_start,
            out_end,
            no_out_end,
            cooldown,
            retention,
        } => {
            let patch = PolicyPatch {
                timezone: timezone.clone(),
                in_start_time: in_start.clone(),
                late_after_time: late_after.clone(),
                out_start_time: out_start.clone(),
                out_end_time: if *no_out_end {
                    Some(None)
                } else {
                    out_end.clone().map(Some)
                },
                cooldown_seconds: *cooldown,
                retention_days: *retention,
            };
            let policy = store.update_policy(&mut pool.conn, &patch)?;
            success(format!(
                "Policy updated (timezone {}, OUT from {}{})",
                policy.timezone,
                policy.out_start.format("%H:%M"),
                policy
                    .out_end
                    .map(|t| format!(" to {}", t.format("%H:%M")))
                    .unwrap_or_default()
            ));
        }
    }

    Ok(())
}
