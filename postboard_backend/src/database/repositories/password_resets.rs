use crate::database::models::PasswordResetRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqlitePasswordResetRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::PasswordResetRepository for SqlitePasswordResetRepository<'conn> {
    fn create(&self, record: &PasswordResetRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO password_resets (token, user_id, expires_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.token, record.user_id, record.expires_at],
        )?;
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<PasswordResetRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT token, user_id, expires_at FROM password_resets WHERE token = ?1",
                params![token],
                |row| {
                    Ok(PasswordResetRecord {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        expires_at: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn delete(&self, token: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM password_resets WHERE token = ?1", params![token])?;
        Ok(())
    }
}
