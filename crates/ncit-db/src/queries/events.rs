use anyhow::Result;
use chrono::Utc;
use rusqlite::Row;
use rusqlite::types::ToSql;
use uuid::Uuid;

use ncit_types::models::{Event, EventStatus, Registrant};

use super::OptionalExt;
use crate::Database;
use crate::columns;
use crate::models::{EventFilter, EventInput};

const EVENT_SELECT: &str = "
    SELECT e.id, e.title, e.description, e.organizer_id, u.full_name, e.category_id, c.name,
           e.event_date, e.end_date, e.location, e.max_participants, e.current_participants,
           e.registration_deadline, e.image_url, e.status, e.created_at, e.updated_at
    FROM events e
    LEFT JOIN users u ON u.id = e.organizer_id
    LEFT JOIN categories c ON c.id = e.category_id";

impl Database {
    // -- Events --

    pub fn insert_event(&self, id: Uuid, organizer_id: Uuid, input: &EventInput) -> Result<()> {
        let now = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, title, description, organizer_id, category_id, event_date,
                                     end_date, location, max_participants, registration_deadline,
                                     image_url, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                rusqlite::params![
                    id.to_string(),
                    input.title,
                    input.description,
                    organizer_id.to_string(),
                    columns::opt_id(input.category_id),
                    input.event_date,
                    input.end_date,
                    input.location,
                    input.max_participants,
                    input.registration_deadline,
                    input.image_url,
                    EventStatus::Upcoming.as_str(),
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE e.id = ?1", EVENT_SELECT);
            conn.query_row(&sql, [id.to_string()], map_event).optional()
        })
    }

    /// Events ordered by start date, soonest first.
    pub fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            params.push(Box::new(status.as_str()));
            clauses.push(format!("e.status = ?{}", params.len()));
        }
        if let Some(category) = filter.category {
            params.push(Box::new(category.to_string()));
            clauses.push(format!("e.category_id = ?{}", params.len()));
        }
        if let Some(after) = filter.starts_after {
            params.push(Box::new(after));
            clauses.push(format!("e.event_date >= ?{}", params.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        params.push(Box::new(filter.limit));
        let limit_idx = params.len();
        params.push(Box::new(filter.offset));
        let offset_idx = params.len();

        let sql = format!(
            "{} {} ORDER BY e.event_date ASC LIMIT ?{} OFFSET ?{}",
            EVENT_SELECT, where_clause, limit_idx, offset_idx
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(refs.as_slice(), map_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_event(&self, id: Uuid, input: &EventInput) -> Result<bool> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE events SET title = ?2, description = ?3, category_id = ?4, event_date = ?5,
                                   end_date = ?6, location = ?7, max_participants = ?8,
                                   registration_deadline = ?9, image_url = ?10, updated_at = ?11
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    input.title,
                    input.description,
                    columns::opt_id(input.category_id),
                    input.event_date,
                    input.end_date,
                    input.location,
                    input.max_participants,
                    input.registration_deadline,
                    input.image_url,
                    now,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_event_status(&self, id: Uuid, status: EventStatus) -> Result<bool> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE events SET status = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), status.as_str(), now],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_event(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM events WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
    }

    // -- Participant counters --

    /// Add one participant. Returns the new count, or `None` when the event is
    /// missing or already at `max_participants`.
    pub fn increment_event_participants(&self, event_id: Uuid) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE events SET current_participants = current_participants + 1
                 WHERE id = ?1
                   AND (max_participants IS NULL OR current_participants < max_participants)
                 RETURNING current_participants",
                [event_id.to_string()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Remove one participant, never going below zero. Returns the new count,
    /// or `None` when the event is missing.
    pub fn decrement_event_participants(&self, event_id: Uuid) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE events SET current_participants = MAX(current_participants - 1, 0)
                 WHERE id = ?1
                 RETURNING current_participants",
                [event_id.to_string()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Registrations --

    /// Returns false if the user already holds a registration for the event.
    pub fn insert_registration(&self, id: Uuid, event_id: Uuid, user_id: Uuid) -> Result<bool> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO event_registrations (id, event_id, user_id, registered_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.to_string(), event_id.to_string(), user_id.to_string(), now],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn delete_registration(&self, event_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM event_registrations WHERE event_id = ?1 AND user_id = ?2",
                [event_id.to_string(), user_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn is_registered(&self, event_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: i64 = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM event_registrations WHERE event_id = ?1 AND user_id = ?2)",
                [event_id.to_string(), user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(found != 0)
        })
    }

    pub fn list_registrants(&self, event_id: Uuid) -> Result<Vec<Registrant>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.user_id, u.full_name, u.email, r.registered_at
                 FROM event_registrations r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.event_id = ?1
                 ORDER BY r.registered_at ASC",
            )?;
            let rows = stmt
                .query_map([event_id.to_string()], |row| {
                    Ok(Registrant {
                        registration_id: columns::uuid(row, 0)?,
                        user_id: columns::uuid(row, 1)?,
                        full_name: row.get(2)?,
                        email: row.get(3)?,
                        registered_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn registered_user_ids(&self, event_id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_id FROM event_registrations WHERE event_id = ?1")?;
            let ids = stmt
                .query_map([event_id.to_string()], |row| columns::uuid(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Events the user is registered for, soonest first.
    pub fn events_for_user(&self, user_id: Uuid) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN event_registrations r ON r.event_id = e.id
                 WHERE r.user_id = ?1
                 ORDER BY e.event_date ASC",
                EVENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], map_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: columns::uuid(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        organizer_id: columns::opt_uuid(row, 3)?,
        organizer_name: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "Unknown".to_string()),
        category_id: columns::opt_uuid(row, 5)?,
        category_name: row.get(6)?,
        event_date: row.get(7)?,
        end_date: row.get(8)?,
        location: row.get(9)?,
        max_participants: row.get(10)?,
        current_participants: row.get(11)?,
        registration_deadline: row.get(12)?,
        image_url: row.get(13)?,
        status: columns::parsed(row, 14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}
