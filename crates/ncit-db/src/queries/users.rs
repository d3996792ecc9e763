use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use ncit_types::models::{Profile, UserRole};

use super::OptionalExt;
use crate::Database;
use crate::columns;
use crate::models::UserRow;

const PROFILE_COLUMNS: &str =
    "id, email, full_name, role, avatar_url, bio, department, created_at, updated_at";

impl Database {
    /// Returns `None` when the email is already taken.
    pub fn create_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: UserRole,
    ) -> Result<Option<Profile>> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id, email, password, full_name, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id.to_string(), email, password_hash, full_name, role.as_str(), now],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            query_profile(conn, id)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {}, password FROM users WHERE email = ?1", PROFILE_COLUMNS);
            conn.query_row(&sql, [email], |row| {
                Ok(UserRow {
                    profile: map_profile(row)?,
                    password: row.get(9)?,
                })
            })
            .optional()
        })
    }

    pub fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    pub fn get_role(&self, id: Uuid) -> Result<Option<UserRole>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT role FROM users WHERE id = ?1", [id.to_string()], |row| {
                columns::parsed::<UserRole>(row, 0)
            })
            .optional()
        })
    }

    /// Partial update; `None` leaves a column untouched.
    pub fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        avatar_url: Option<&str>,
        bio: Option<&str>,
        department: Option<&str>,
    ) -> Result<Option<Profile>> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    full_name  = COALESCE(?2, full_name),
                    avatar_url = COALESCE(?3, avatar_url),
                    bio        = COALESCE(?4, bio),
                    department = COALESCE(?5, department),
                    updated_at = ?6
                 WHERE id = ?1",
                rusqlite::params![id.to_string(), full_name, avatar_url, bio, department, now],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_profile(conn, id)
        })
    }

    pub fn list_users(&self, search: Option<&str>) -> Result<Vec<Profile>> {
        self.with_conn(|conn| {
            let pattern = search.map(|s| format!("%{}%", s.trim().to_lowercase()));
            let sql = format!(
                "SELECT {} FROM users
                 WHERE ?1 IS NULL OR lower(full_name) LIKE ?1 OR email LIKE ?1
                 ORDER BY created_at DESC",
                PROFILE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([pattern], map_profile)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_role(&self, id: Uuid, role: UserRole) -> Result<bool> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), role.as_str(), now],
            )?;
            Ok(changed > 0)
        })
    }

    /// Promote an existing account to admin. Returns false if no such email.
    pub fn promote_to_admin(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?2 WHERE email = ?1",
                rusqlite::params![email, UserRole::Admin.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a user and everything they own. Seats and likes they held are
    /// released first since their rows go away by cascade. Events they
    /// organized stay, with no organizer.
    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE events SET current_participants = MAX(current_participants - 1, 0)
                 WHERE id IN (SELECT event_id FROM event_registrations WHERE user_id = ?1)",
                [id.to_string()],
            )?;
            tx.execute(
                "UPDATE blogs SET likes = MAX(likes - 1, 0)
                 WHERE id IN (SELECT blog_id FROM blog_likes WHERE user_id = ?1)",
                [id.to_string()],
            )?;
            tx.execute(
                "UPDATE comments SET likes = MAX(likes - 1, 0)
                 WHERE id IN (SELECT comment_id FROM comment_likes WHERE user_id = ?1)",
                [id.to_string()],
            )?;
            let removed = tx.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }

    pub fn user_ids_with_role(&self, role: UserRole) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users WHERE role = ?1")?;
            let ids = stmt
                .query_map([role.as_str()], |row| columns::uuid(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn all_user_ids(&self) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users")?;
            let ids = stmt
                .query_map([], |row| columns::uuid(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }
}

fn query_profile(conn: &Connection, id: Uuid) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", PROFILE_COLUMNS);
    conn.query_row(&sql, [id.to_string()], map_profile).optional()
}

fn map_profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: columns::uuid(row, 0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: columns::parsed(row, 3)?,
        avatar_url: row.get(4)?,
        bio: row.get(5)?,
        department: row.get(6)?,
        created_at: row.get::<_, DateTime<Utc>>(7)?,
        updated_at: row.get::<_, DateTime<Utc>>(8)?,
    })
}
