use std::str::FromStr;

use anyhow::Result;
use rusqlite::Connection;

use ncit_types::api::{BlogCounts, DashboardStats, EventCounts};
use ncit_types::models::{BlogStatus, EventStatus};

use crate::Database;
use crate::columns;

impl Database {
    pub fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.with_conn(|conn| {
            let mut stats = DashboardStats {
                users: count(conn, "SELECT COUNT(*) FROM users")?,
                registrations: count(conn, "SELECT COUNT(*) FROM event_registrations")?,
                comments: count(conn, "SELECT COUNT(*) FROM comments")?,
                blogs: BlogCounts::default(),
                events: EventCounts::default(),
            };

            for (status, n) in counts_by_status::<BlogStatus>(conn, "blogs")? {
                let slot = match status {
                    BlogStatus::Draft => &mut stats.blogs.draft,
                    BlogStatus::Pending => &mut stats.blogs.pending,
                    BlogStatus::Published => &mut stats.blogs.published,
                    BlogStatus::Archived => &mut stats.blogs.archived,
                };
                *slot = n;
            }

            for (status, n) in counts_by_status::<EventStatus>(conn, "events")? {
                let slot = match status {
                    EventStatus::Upcoming => &mut stats.events.upcoming,
                    EventStatus::Ongoing => &mut stats.events.ongoing,
                    EventStatus::Completed => &mut stats.events.completed,
                    EventStatus::Cancelled => &mut stats.events.cancelled,
                };
                *slot = n;
            }

            Ok(stats)
        })
    }
}

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

/// `(status, rows)` pairs for a table with a `status` column.
fn counts_by_status<S>(conn: &Connection, table: &str) -> Result<Vec<(S, i64)>>
where
    S: FromStr,
    S::Err: std::error::Error + Send + Sync + 'static,
{
    let sql = format!("SELECT status, COUNT(*) FROM {} GROUP BY status", table);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((columns::parsed::<S>(row, 0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
