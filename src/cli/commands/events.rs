use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::policy_store::PolicyStore;
use crate::db::queries::list_events;
use crate::errors::{AppError, AppResult};
use crate::models::event::EventFilter;
use crate::models::status::Status;
use crate::ui::messages::info;
use crate::utils::colors::{RESET, color_for_status};
use crate::utils::date::parse_date;
use crate::utils::table::{Column, Table};
use crate::utils::time::local_hms;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Events {
        status,
        name,
        day,
        device,
        limit,
        offset,
        json,
    } = cmd
    {
        let filter = EventFilter {
            status: status
                .as_deref()
                .map(|s| Status::from_db_str(s).ok_or_else(|| AppError::InvalidStatus(s.into())))
                .transpose()?,
            name: name.clone(),
            day: day
                .as_deref()
                .map(|d| parse_date(d).ok_or_else(|| AppError::InvalidDate(d.into())))
                .transpose()?,
            device_id: device.clone(),
            limit: *limit as usize,
            offset: *offset as usize,
        };

        let pool = super::open_db(cfg)?;
        let events = list_events(&pool.conn, &filter)?;
        if *json {
            return super::print_json(&events);
        }
        if events.is_empty() {
            info("No events found.");
            return Ok(());
        }

        let policy = PolicyStore::default().get_policy(&pool.conn)?;
        let mut table = Table::new(vec![
            Column::new("ID", 4),
            Column::new("DAY", 10),
            Column::new("TIME", 8),
            Column::new("DEVICE", 8),
            Column::new("NAME", 10),
            Column::new("TYPE", 4),
            Column::new("LATE", 4),
            Column::new("STATUS", 8),
            Column::new("DIST", 6),
            Column::new("EDITED", 6),
        ]);
        for ev in &events {
            table.add_row(vec![
                ev.id.to_string(),
                ev.day.map(|d| d.to_string()).unwrap_or_else(|| "--".into()),
                local_hms(&ev.ts, &policy.timezone),
                ev.device_id.clone(),
                ev.final_name.clone().unwrap_or_else(|| "--".into()),
                ev.event_type.map(|t| t.to_string()).unwrap_or_else(|| "--".into()),
                if ev.is_late { "yes".into() } else { "".into() },
                ev.status.to_string(),
                ev.distance.map(|d| format!("{:.3}", d)).unwrap_or_default(),
                ev.edited_by.clone().unwrap_or_default(),
            ]);
        }

        let rendered = table.render();
        let mut lines = rendered.lines();
        if let Some(header) = lines.next() {
            println!("{}", header);
        }
        for (line, ev) in lines.zip(&events) {
            println!("{}{}{}", color_for_status(ev.status), line, RESET);
        }
    }
    Ok(())
}
