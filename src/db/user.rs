//! User record storage.
//!
//! Each user holds at most one active refresh token; storing a new one
//! replaces the previous value. Access tokens are stateless and never
//! touch this table.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// A user record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// The single currently valid refresh token, if any.
    pub refresh_token: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    refresh_token: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            refresh_token: row.refresh_token,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(&self, email: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (email) VALUES (?)")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, refresh_token FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, refresh_token FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Store the user's refresh token, replacing any previous one.
    /// The replaced token is no longer valid for exchange.
    pub async fn set_refresh_token(&self, id: i64, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Clear the user's refresh token (logout).
    pub async fn clear_refresh_token(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Look up the user whose record matches all of id, email, and the
    /// presented refresh token exactly. The token comparison is
    /// byte-exact; a superseded or unknown token matches nothing.
    pub async fn find_by_identity_and_refresh_token(
        &self,
        id: i64,
        email: &str,
        refresh_token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, refresh_token FROM users WHERE id = ? AND email = ? AND refresh_token = ?",
        )
        .bind(id)
        .bind(email)
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }
}
