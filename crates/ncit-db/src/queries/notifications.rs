use anyhow::Result;
use chrono::Utc;
use rusqlite::Row;
use uuid::Uuid;

use ncit_types::models::Notification;

use crate::Database;
use crate::columns;
use crate::models::NewNotification;

impl Database {
    /// Insert a batch in one transaction and return the stored notifications.
    pub fn insert_notifications(&self, batch: &[NewNotification]) -> Result<Vec<Notification>> {
        if batch.is_empty() {
            return Ok(vec![]);
        }

        let now = Utc::now();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut created = Vec::with_capacity(batch.len());
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO notifications (id, user_id, kind, title, message, link, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for n in batch {
                    let id = Uuid::new_v4();
                    stmt.execute(rusqlite::params![
                        id.to_string(),
                        n.user_id.to_string(),
                        n.kind.as_str(),
                        n.title,
                        n.message,
                        n.link,
                        now,
                    ])?;
                    created.push(Notification {
                        id,
                        user_id: n.user_id,
                        kind: n.kind,
                        title: n.title.clone(),
                        message: n.message.clone(),
                        link: n.link.clone(),
                        is_read: false,
                        created_at: now,
                    });
                }
            }
            tx.commit()?;
            Ok(created)
        })
    }

    pub fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, title, message, link, is_read, created_at
                 FROM notifications
                 WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![user_id.to_string(), unread_only, limit],
                    map_notification,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Scoped to the owner: marking someone else's notification is a no-op.
    pub fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                [id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
            )?;
            Ok(changed)
        })
    }

    pub fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                [id.to_string(), user_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: columns::uuid(row, 0)?,
        user_id: columns::uuid(row, 1)?,
        kind: columns::parsed(row, 2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        link: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}
