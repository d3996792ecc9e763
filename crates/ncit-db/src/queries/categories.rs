use anyhow::Result;
use rusqlite::Row;
use uuid::Uuid;

use ncit_types::models::{Category, CategoryKind};

use super::OptionalExt;
use crate::Database;
use crate::columns;

impl Database {
    pub fn list_categories(&self, kind: Option<CategoryKind>) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind, description FROM categories
                 WHERE ?1 IS NULL OR kind = ?1
                 ORDER BY kind, name",
            )?;
            let rows = stmt
                .query_map([kind.map(|k| k.as_str())], map_category)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, kind, description FROM categories WHERE id = ?1",
                [id.to_string()],
                map_category,
            )
            .optional()
        })
    }

    /// Returns `None` when a category with that name already exists for the kind.
    pub fn create_category(
        &self,
        id: Uuid,
        name: &str,
        kind: CategoryKind,
        description: Option<&str>,
    ) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO categories (id, name, kind, description) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.to_string(), name, kind.as_str(), description],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(Category {
                id,
                name: name.to_string(),
                kind,
                description: description.map(str::to_string),
            }))
        })
    }

    pub fn delete_category(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM categories WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
    }
}

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: columns::uuid(row, 0)?,
        name: row.get(1)?,
        kind: columns::parsed(row, 2)?,
        description: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing::{seed_blog, seed_user};
    use ncit_types::models::{BlogStatus, UserRole};

    #[test]
    fn seeded_categories_are_split_by_kind() {
        let db = Database::open_in_memory().unwrap();
        let blog = db.list_categories(Some(CategoryKind::Blog)).unwrap();
        let event = db.list_categories(Some(CategoryKind::Event)).unwrap();
        assert!(blog.iter().all(|c| c.kind == CategoryKind::Blog));
        assert!(event.iter().any(|c| c.name == "Workshop"));
        assert_eq!(db.list_categories(None).unwrap().len(), blog.len() + event.len());
    }

    #[test]
    fn names_are_unique_per_kind() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_category(Uuid::new_v4(), "Alumni", CategoryKind::Blog, None)
            .unwrap();
        assert!(created.is_some());
        assert!(db
            .create_category(Uuid::new_v4(), "Alumni", CategoryKind::Blog, None)
            .unwrap()
            .is_none());
        assert!(db
            .create_category(Uuid::new_v4(), "Alumni", CategoryKind::Event, Some("Meetups"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn deleting_a_category_detaches_blogs() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "a@ncit.edu.np", UserRole::Student);
        let category = db
            .create_category(Uuid::new_v4(), "Alumni", CategoryKind::Blog, None)
            .unwrap()
            .unwrap();
        let blog = seed_blog(&db, author, BlogStatus::Draft);
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE blogs SET category_id = ?1 WHERE id = ?2",
                [category.id.to_string(), blog.to_string()],
            )?;
            Ok(())
        })
        .unwrap();
        assert_eq!(db.get_blog(blog).unwrap().unwrap().category_name.as_deref(), Some("Alumni"));

        assert!(db.delete_category(category.id).unwrap());
        assert!(db.get_category(category.id).unwrap().is_none());
        assert!(db.get_blog(blog).unwrap().unwrap().category_id.is_none());
    }
}
