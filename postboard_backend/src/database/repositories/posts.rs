use crate::database::models::{CategoryRecord, NewPost, PostRecord, Visibility};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const POST_COLUMNS: &str =
    "p.id, p.author_id, p.title, p.content, p.status, p.publish_date, p.updated_at";

/// `(show_all, viewer_id)` bound into the shared visibility predicate.
const VISIBILITY_PREDICATE: &str = "(?1 = 1 OR p.status = 'ACTIVE' OR p.author_id = ?2)";

fn visibility_params(visibility: Visibility) -> (bool, i64) {
    match visibility {
        Visibility::All => (true, 0),
        Visibility::ActiveOrAuthoredBy(viewer) => (false, viewer),
    }
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        author_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        status: row.get(4)?,
        publish_date: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &NewPost) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO posts (author_id, title, content, status, publish_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.author_id,
                record.title,
                record.content,
                record.status,
                record.publish_date,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
                params![id],
                map_post,
            )
            .optional()?)
    }

    fn list(
        &self,
        visibility: Visibility,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>> {
        let (show_all, viewer) = visibility_params(visibility);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            WHERE {VISIBILITY_PREDICATE}
            ORDER BY p.publish_date DESC, p.id DESC
            LIMIT ?3 OFFSET ?4
            "#
        ))?;
        let rows = stmt.query_map(params![show_all, viewer, limit, offset], map_post)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn count(&self, visibility: Visibility) -> Result<usize> {
        let (show_all, viewer) = visibility_params(visibility);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM posts p WHERE {VISIBILITY_PREDICATE}"),
            params![show_all, viewer],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list_by_author(
        &self,
        author_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            WHERE p.author_id = ?1
            ORDER BY p.publish_date DESC, p.id DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))?;
        let rows = stmt.query_map(params![author_id, limit, offset], map_post)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn count_by_author(&self, author_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
            params![author_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list_in_category(
        &self,
        category_id: i64,
        visibility: Visibility,
    ) -> Result<Vec<PostRecord>> {
        let (show_all, viewer) = visibility_params(visibility);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            INNER JOIN post_categories pc ON pc.post_id = p.id
            WHERE pc.category_id = ?3 AND {VISIBILITY_PREDICATE}
            ORDER BY p.publish_date DESC, p.id DESC
            "#
        ))?;
        let rows = stmt.query_map(params![show_all, viewer, category_id], map_post)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn list_ids_by_author(&self, author_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM posts WHERE author_id = ?1")?;
        let rows = stmt.query_map(params![author_id], |row| row.get::<_, i64>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn update(&self, record: &PostRecord) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE posts
            SET title = ?2, content = ?3, status = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.title,
                record.content,
                record.status,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn add_categories(&self, post_id: i64, category_ids: &[i64]) -> Result<()> {
        if category_ids.is_empty() {
            return Ok(());
        }
        let mut stmt = self.conn.prepare(
            r#"
            INSERT OR IGNORE INTO post_categories (post_id, category_id)
            VALUES (?1, ?2)
            "#,
        )?;
        for category_id in category_ids {
            stmt.execute(params![post_id, category_id])?;
        }
        Ok(())
    }

    fn categories_of(&self, post_id: i64) -> Result<Vec<CategoryRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, c.title, c.description
            FROM categories c
            INNER JOIN post_categories pc ON pc.category_id = c.id
            WHERE pc.post_id = ?1
            ORDER BY c.id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![post_id], |row| {
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
}
