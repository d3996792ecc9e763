use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::Row;
use rusqlite::types::ToSql;
use uuid::Uuid;

use ncit_types::models::{Blog, BlogStatus};

use super::OptionalExt;
use crate::Database;
use crate::columns;
use crate::models::{BlogFilter, BlogInput};

const BLOG_SELECT: &str = "
    SELECT b.id, b.title, b.content, b.excerpt, b.author_id, u.full_name,
           b.category_id, c.name, b.tags, b.images, b.status, b.views, b.likes,
           b.rejection_reason, b.created_at, b.updated_at, b.published_at
    FROM blogs b
    LEFT JOIN users u ON u.id = b.author_id
    LEFT JOIN categories c ON c.id = b.category_id";

impl Database {
    pub fn insert_blog(&self, id: Uuid, author_id: Uuid, input: &BlogInput) -> Result<()> {
        let now = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blogs (id, title, content, excerpt, author_id, category_id, tags, images,
                                    status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                rusqlite::params![
                    id.to_string(),
                    input.title,
                    input.content,
                    input.excerpt,
                    author_id.to_string(),
                    columns::opt_id(input.category_id),
                    columns::encode_list(&input.tags),
                    columns::encode_list(&input.images),
                    input.status.as_str(),
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_blog(&self, id: Uuid) -> Result<Option<Blog>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE b.id = ?1", BLOG_SELECT);
            conn.query_row(&sql, [id.to_string()], map_blog).optional()
        })
    }

    /// Published blogs, newest first, narrowed by the optional filters.
    pub fn list_published(&self, filter: &BlogFilter) -> Result<Vec<Blog>> {
        let mut clauses = vec!["b.status = 'published'".to_string()];
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(category) = filter.category {
            params.push(Box::new(category.to_string()));
            clauses.push(format!("b.category_id = ?{}", params.len()));
        }
        if let Some(author) = filter.author {
            params.push(Box::new(author.to_string()));
            clauses.push(format!("b.author_id = ?{}", params.len()));
        }
        if let Some(tag) = &filter.tag {
            params.push(Box::new(tag.trim().to_lowercase()));
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM json_each(b.tags) WHERE json_each.value = ?{})",
                params.len()
            ));
        }
        if let Some(search) = &filter.search {
            params.push(Box::new(format!("%{}%", search.trim())));
            let n = params.len();
            clauses.push(format!("(b.title LIKE ?{n} OR b.excerpt LIKE ?{n} OR b.content LIKE ?{n})"));
        }

        params.push(Box::new(filter.limit));
        let limit_idx = params.len();
        params.push(Box::new(filter.offset));
        let offset_idx = params.len();

        let sql = format!(
            "{} WHERE {} ORDER BY COALESCE(b.published_at, b.created_at) DESC LIMIT ?{} OFFSET ?{}",
            BLOG_SELECT,
            clauses.join(" AND "),
            limit_idx,
            offset_idx
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(refs.as_slice(), map_blog)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_blogs_by_author(&self, author_id: Uuid) -> Result<Vec<Blog>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE b.author_id = ?1 ORDER BY b.updated_at DESC", BLOG_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([author_id.to_string()], map_blog)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Moderation queue. `None` lists every blog.
    pub fn list_blogs_by_status(&self, status: Option<BlogStatus>) -> Result<Vec<Blog>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE ?1 IS NULL OR b.status = ?1 ORDER BY b.updated_at ASC",
                BLOG_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([status.map(|s| s.as_str())], map_blog)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrite the author-editable columns. `rejection_reason` is written as given.
    pub fn update_blog(
        &self,
        id: Uuid,
        input: &BlogInput,
        rejection_reason: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE blogs SET title = ?2, content = ?3, excerpt = ?4, category_id = ?5,
                                  tags = ?6, images = ?7, status = ?8, rejection_reason = ?9,
                                  updated_at = ?10
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    input.title,
                    input.content,
                    input.excerpt,
                    columns::opt_id(input.category_id),
                    columns::encode_list(&input.tags),
                    columns::encode_list(&input.images),
                    input.status.as_str(),
                    rejection_reason,
                    now,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Unconditional status assignment; callers decide who may do what.
    /// Publishing stamps `published_at` the first time only.
    pub fn set_blog_status(
        &self,
        id: Uuid,
        status: BlogStatus,
        rejection_reason: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE blogs SET status = ?2, rejection_reason = ?3, updated_at = ?4,
                        published_at = CASE WHEN ?2 = 'published'
                                            THEN COALESCE(published_at, ?4)
                                            ELSE published_at END
                 WHERE id = ?1",
                rusqlite::params![id.to_string(), status.as_str(), rejection_reason, now],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_blog(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM blogs WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
    }

    pub fn increment_blog_views(&self, id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE blogs SET views = views + 1 WHERE id = ?1 RETURNING views",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| anyhow!("Blog not found: {}", id))
        })
    }

    /// Toggle a like: removes if present, inserts if not, keeping `likes` in step.
    /// Returns (liked, likes).
    pub fn toggle_blog_like(&self, blog_id: Uuid, user_id: Uuid) -> Result<(bool, i64)> {
        let now = Utc::now();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let (bid, uid) = (blog_id.to_string(), user_id.to_string());

            let removed = tx.execute(
                "DELETE FROM blog_likes WHERE blog_id = ?1 AND user_id = ?2",
                [&bid, &uid],
            )?;
            let liked = if removed > 0 {
                tx.execute("UPDATE blogs SET likes = MAX(likes - 1, 0) WHERE id = ?1", [&bid])?;
                false
            } else {
                tx.execute(
                    "INSERT INTO blog_likes (blog_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![bid, uid, now],
                )?;
                tx.execute("UPDATE blogs SET likes = likes + 1 WHERE id = ?1", [&bid])?;
                true
            };

            let likes: i64 = tx.query_row("SELECT likes FROM blogs WHERE id = ?1", [&bid], |r| r.get(0))?;
            tx.commit()?;
            Ok((liked, likes))
        })
    }
}

fn map_blog(row: &Row<'_>) -> rusqlite::Result<Blog> {
    let content: String = row.get(2)?;
    let reading_time = ncit_content::reading_time_minutes(&content);
    Ok(Blog {
        id: columns::uuid(row, 0)?,
        title: row.get(1)?,
        content,
        excerpt: row.get(3)?,
        author_id: columns::uuid(row, 4)?,
        author_name: row
            .get::<_, Option<String>>(5)?
            .unwrap_or_else(|| "Unknown".to_string()),
        category_id: columns::opt_uuid(row, 6)?,
        category_name: row.get(7)?,
        tags: columns::string_list(row, 8)?,
        images: columns::string_list(row, 9)?,
        status: columns::parsed(row, 10)?,
        views: row.get(11)?,
        likes: row.get(12)?,
        reading_time,
        rejection_reason: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        published_at: row.get(16)?,
    })
}
