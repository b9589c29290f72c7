use crate::database::models::CategoryRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteCategoryRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::CategoryRepository for SqliteCategoryRepository<'conn> {
    fn create(&self, title: &str, description: Option<&str>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO categories (title, description) VALUES (?1, ?2)",
            params![title, description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<CategoryRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, title, description FROM categories WHERE id = ?1",
                params![id],
                |row| {
                    Ok(CategoryRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn list(&self) -> Result<Vec<CategoryRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, description FROM categories ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(CategoryRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
            })
        })?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    fn update(&self, record: &CategoryRecord) -> Result<()> {
        self.conn.execute(
            "UPDATE categories SET title = ?2, description = ?3 WHERE id = ?1",
            params![record.id, record.title, record.description],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        Ok(())
    }
}
