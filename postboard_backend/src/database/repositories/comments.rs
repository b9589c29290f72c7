use crate::database::models::{CommentRecord, NewComment, Visibility};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteCommentRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COMMENT_COLUMNS: &str =
    "id, post_id, parent_comment_id, author_id, content, status, publish_date, updated_at";

const VISIBILITY_PREDICATE: &str = "(?2 = 1 OR status = 'ACTIVE' OR author_id = ?3)";

fn visibility_params(visibility: Visibility) -> (bool, i64) {
    match visibility {
        Visibility::All => (true, 0),
        Visibility::ActiveOrAuthoredBy(viewer) => (false, viewer),
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get(0)?,
        post_id: row.get(1)?,
        parent_comment_id: row.get(2)?,
        author_id: row.get(3)?,
        content: row.get(4)?,
        status: row.get(5)?,
        publish_date: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl<'conn> SqliteCommentRepository<'conn> {
    fn collect_ids(&self, sql: &str, key: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![key], |row| row.get::<_, i64>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}

impl<'conn> super::CommentRepository for SqliteCommentRepository<'conn> {
    fn create(&self, record: &NewComment) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO comments (post_id, parent_comment_id, author_id, content, publish_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.post_id,
                record.parent_comment_id,
                record.author_id,
                record.content,
                record.publish_date,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<CommentRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![id],
                map_comment,
            )
            .optional()?)
    }

    fn list_for_post(
        &self,
        post_id: i64,
        visibility: Visibility,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CommentRecord>> {
        let (show_all, viewer) = visibility_params(visibility);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE post_id = ?1 AND {VISIBILITY_PREDICATE}
            ORDER BY publish_date DESC, id DESC
            LIMIT ?4 OFFSET ?5
            "#
        ))?;
        let rows = stmt.query_map(
            params![post_id, show_all, viewer, limit, offset],
            map_comment,
        )?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn count_for_post(&self, post_id: i64, visibility: Visibility) -> Result<usize> {
        let (show_all, viewer) = visibility_params(visibility);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM comments WHERE post_id = ?1 AND {VISIBILITY_PREDICATE}"),
            params![post_id, show_all, viewer],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list_all_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE post_id = ?1
            ORDER BY publish_date ASC, id ASC
            "#
        ))?;
        let rows = stmt.query_map(params![post_id], map_comment)?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn list_ids_for_post(&self, post_id: i64) -> Result<Vec<i64>> {
        self.collect_ids("SELECT id FROM comments WHERE post_id = ?1", post_id)
    }

    fn list_ids_by_author(&self, author_id: i64) -> Result<Vec<i64>> {
        self.collect_ids("SELECT id FROM comments WHERE author_id = ?1", author_id)
    }

    fn update(&self, record: &CommentRecord) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE comments
            SET content = ?2, status = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
            params![record.id, record.content, record.status, record.updated_at],
        )?;
        Ok(())
    }

    fn detach_replies(&self, parent_id: i64) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE comments SET parent_comment_id = NULL WHERE parent_comment_id = ?1",
            params![parent_id],
        )?;
        Ok(changed)
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(())
    }
}
