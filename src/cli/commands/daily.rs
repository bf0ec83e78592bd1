use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::policy_store::PolicyStore;
use crate::db::queries::list_daily;
use crate::errors::{AppError, AppResult};
use crate::models::daily::DailyFilter;
use crate::ui::messages::info;
use crate::utils::colors::{RESET, YELLOW};
use crate::utils::date::{parse_date, parse_month};
use crate::utils::table::{Column, Table};
use crate::utils::time::local_hms;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Daily {
        day,
        month,
        name,
        limit,
        offset,
        json,
    } = cmd
    {
        let filter = DailyFilter {
            day: day
                .as_deref()
                .map(|d| parse_date(d).ok_or_else(|| AppError::InvalidDate(d.into())))
                .transpose()?,
            month: month
                .as_deref()
                .map(|m| parse_month(m).ok_or_else(|| AppError::InvalidDate(m.into())))
                .transpose()?,
            name: name.clone(),
            limit: *limit as usize,
            offset: *offset as usize,
        };

        let pool = super::open_db(cfg)?;
        let rows = list_daily(&pool.conn, &filter)?;
        if *json {
            return super::print_json(&rows);
        }
        if rows.is_empty() {
            info("No daily records found.");
            return Ok(());
        }

        let tz = PolicyStore::default().get_policy(&pool.conn)?.timezone;
        let mut table = Table::new(vec![
            Column::new("DAY", 10),
            Column::new("NAME", 12),
            Column::new("IN", 8),
            Column::new("LATE", 4),
            Column::new("OUT", 8),
        ]);
        for d in &rows {
            table.add_row(vec![
                d.day.to_string(),
                d.person_name.clone(),
                d.in_time
                    .map(|t| local_hms(&t, &tz))
                    .unwrap_or_else(|| "--:--:--".into()),
                if d.in_is_late { "yes".into() } else { "".into() },
                d.out_time
                    .map(|t| local_hms(&t, &tz))
                    .unwrap_or_else(|| "--:--:--".into()),
            ]);
        }

        let rendered = table.render();
        let mut lines = rendered.lines();
        if let Some(header) = lines.next() {
            println!("{}", header);
        }
        for (line, d) in lines.zip(&rows) {
            if d.in_is_late {
                println!("{}{}{}", YELLOW, line, RESET);
            } else {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
