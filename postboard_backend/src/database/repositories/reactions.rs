use crate::database::models::{ReactionKind, ReactionRecord, ReactionTally, TargetKind};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteReactionRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_reaction(row: &Row<'_>) -> rusqlite::Result<ReactionRecord> {
    Ok(ReactionRecord {
        id: row.get(0)?,
        author_id: row.get(1)?,
        target_kind: row.get(2)?,
        target_id: row.get(3)?,
        kind: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl<'conn> super::ReactionRepository for SqliteReactionRepository<'conn> {
    fn find(
        &self,
        author_id: i64,
        target_kind: TargetKind,
        target_id: i64,
    ) -> Result<Option<ReactionRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, author_id, target_kind, target_id, kind, created_at
                FROM reactions
                WHERE author_id = ?1 AND target_kind = ?2 AND target_id = ?3
                "#,
                params![author_id, target_kind, target_id],
                map_reaction,
            )
            .optional()?)
    }

    fn insert(
        &self,
        author_id: i64,
        target_kind: TargetKind,
        target_id: i64,
        kind: ReactionKind,
        created_at: &str,
    ) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO reactions (author_id, target_kind, target_id, kind, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![author_id, target_kind, target_id, kind, created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn set_kind(&self, id: i64, kind: ReactionKind) -> Result<()> {
        self.conn.execute(
            "UPDATE reactions SET kind = ?2 WHERE id = ?1",
            params![id, kind],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM reactions WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn list_for_target(
        &self,
        target_kind: TargetKind,
        target_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReactionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, author_id, target_kind, target_id, kind, created_at
            FROM reactions
            WHERE target_kind = ?1 AND target_id = ?2
            ORDER BY id DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )?;
        let rows = stmt.query_map(
            params![target_kind, target_id, limit, offset],
            map_reaction,
        )?;

        let mut reactions = Vec::new();
        for row in rows {
            reactions.push(row?);
        }
        Ok(reactions)
    }

    fn count_for_target(&self, target_kind: TargetKind, target_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reactions WHERE target_kind = ?1 AND target_id = ?2",
            params![target_kind, target_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn tally(&self, target_kind: TargetKind, target_id: i64) -> Result<ReactionTally> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT kind, COUNT(*) as count
            FROM reactions
            WHERE target_kind = ?1 AND target_id = ?2
            GROUP BY kind
            "#,
        )?;
        let rows = stmt.query_map(params![target_kind, target_id], |row| {
            Ok((row.get::<_, ReactionKind>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut tally = ReactionTally::default();
        for row in rows {
            match row? {
                (ReactionKind::Like, count) => tally.likes = count,
                (ReactionKind::Dislike, count) => tally.dislikes = count,
            }
        }
        Ok(tally)
    }

    fn delete_for_targets(&self, target_kind: TargetKind, target_ids: &[i64]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("DELETE FROM reactions WHERE target_kind = ?1 AND target_id = ?2")?;
        for target_id in target_ids {
            stmt.execute(params![target_kind, target_id])?;
        }
        Ok(())
    }

    fn delete_by_author(&self, author_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM reactions WHERE author_id = ?1", params![author_id])?;
        Ok(())
    }
}
