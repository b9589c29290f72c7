use crate::database::models::{NewUser, Role, UserRecord};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const USER_COLUMNS: &str =
    "id, login, email, full_name, password_hash, role, status, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        login: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        password_hash: row.get(4)?,
        role: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn create(&self, record: &NewUser) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO users (login, email, full_name, password_hash, role, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.login,
                record.email,
                record.full_name,
                record.password_hash,
                record.role,
                record.status,
                record.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                map_user,
            )
            .optional()?)
    }

    fn find_by_login_or_email(&self, login_or_email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE login = ?1 OR email = ?1 LIMIT 1"
                ),
                params![login_or_email],
                map_user,
            )
            .optional()?)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                map_user,
            )
            .optional()?)
    }

    fn list(&self) -> Result<Vec<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))?;
        let rows = stmt.query_map([], map_user)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    fn update_profile(&self, id: i64, full_name: &str, email: &str, login: &str) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE users SET full_name = ?2, email = ?3, login = ?4
            WHERE id = ?1
            "#,
            params![id, full_name, email, login],
        )?;
        Ok(())
    }

    fn update_role(&self, id: i64, role: Role) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET role = ?2 WHERE id = ?1",
            params![id, role],
        )?;
        Ok(())
    }

    fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET password_hash = ?2 WHERE id = ?1",
            params![id, password_hash],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(())
    }
}
