use anyhow::Result;
use chrono::Utc;
use rusqlite::Row;
use uuid::Uuid;

use ncit_types::models::Comment;

use super::OptionalExt;
use crate::Database;
use crate::columns;

const COMMENT_SELECT: &str = "
    SELECT c.id, c.blog_id, c.author_id, u.full_name, c.parent_id, c.content, c.likes,
           c.is_edited, c.created_at, c.updated_at
    FROM comments c
    LEFT JOIN users u ON u.id = c.author_id";

impl Database {
    pub fn insert_comment(
        &self,
        id: Uuid,
        blog_id: Uuid,
        author_id: Uuid,
        parent_id: Option<Uuid>,
        content: &str,
    ) -> Result<()> {
        let now = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, blog_id, author_id, parent_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![
                    id.to_string(),
                    blog_id.to_string(),
                    author_id.to_string(),
                    columns::opt_id(parent_id),
                    content,
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
            conn.query_row(&sql, [id.to_string()], map_comment).optional()
        })
    }

    /// All comments on a blog, flat and oldest first. Threading happens above.
    pub fn list_comments(&self, blog_id: Uuid) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.blog_id = ?1 ORDER BY c.created_at ASC, c.rowid ASC", COMMENT_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([blog_id.to_string()], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: Uuid, content: &str) -> Result<bool> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?2, is_edited = 1, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), content, now],
            )?;
            Ok(changed > 0)
        })
    }

    /// Replies go with their parent via ON DELETE CASCADE.
    pub fn delete_comment(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM comments WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
    }

    /// Same shape as `toggle_blog_like`. Returns (liked, likes).
    pub fn toggle_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<(bool, i64)> {
        let now = Utc::now();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let (cid, uid) = (comment_id.to_string(), user_id.to_string());

            let removed = tx.execute(
                "DELETE FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
                [&cid, &uid],
            )?;
            let liked = if removed > 0 {
                tx.execute("UPDATE comments SET likes = MAX(likes - 1, 0) WHERE id = ?1", [&cid])?;
                false
            } else {
                tx.execute(
                    "INSERT INTO comment_likes (comment_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![cid, uid, now],
                )?;
                tx.execute("UPDATE comments SET likes = likes + 1 WHERE id = ?1", [&cid])?;
                true
            };

            let likes: i64 =
                tx.query_row("SELECT likes FROM comments WHERE id = ?1", [&cid], |r| r.get(0))?;
            tx.commit()?;
            Ok((liked, likes))
        })
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: columns::uuid(row, 0)?,
        blog_id: columns::uuid(row, 1)?,
        author_id: columns::uuid(row, 2)?,
        author_name: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "Unknown".to_string()),
        parent_id: columns::opt_uuid(row, 4)?,
        content: row.get(5)?,
        likes: row.get(6)?,
        is_edited: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        replies: Vec::new(),
    })
}
