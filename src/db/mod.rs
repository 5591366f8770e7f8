mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use user::{User, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        // An in-memory database exists per connection, so the pool must
        // stay at one connection or queries would see separate empty
        // databases.
        let (url, max_connections) = if path == ":memory:" {
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite:{}?mode=rwc", path), 5)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Users table. refresh_token holds the single currently
                // valid refresh token for the user; NULL means no active
                // session.
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT UNIQUE NOT NULL,
                    refresh_token TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_email ON users(email)",
            ],
        )
        .await
    }

    /// Get the user store.
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db.users().create("alice@example.com").await.unwrap();

        let user = db
            .users()
            .get_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "alice@example.com");
        assert!(user.refresh_token.is_none());

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn test_duplicate_email_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("alice@example.com").await.unwrap();
        let result = db.users().create("alice@example.com").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_refresh_token_replaces_previous() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.users().create("alice@example.com").await.unwrap();

        db.users().set_refresh_token(id, "token-1").await.unwrap();
        db.users().set_refresh_token(id, "token-2").await.unwrap();

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("token-2"));

        // The superseded token no longer matches
        let stale = db
            .users()
            .find_by_identity_and_refresh_token(id, "alice@example.com", "token-1")
            .await
            .unwrap();
        assert!(stale.is_none());
    }

    #[tokio::test]
    async fn test_find_by_identity_and_refresh_token_requires_exact_match() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.users().create("alice@example.com").await.unwrap();
        db.users().set_refresh_token(id, "token-1").await.unwrap();

        let found = db
            .users()
            .find_by_identity_and_refresh_token(id, "alice@example.com", "token-1")
            .await
            .unwrap();
        assert!(found.is_some());

        // Wrong token
        assert!(
            db.users()
                .find_by_identity_and_refresh_token(id, "alice@example.com", "token-2")
                .await
                .unwrap()
                .is_none()
        );

        // Wrong email
        assert!(
            db.users()
                .find_by_identity_and_refresh_token(id, "bob@example.com", "token-1")
                .await
                .unwrap()
                .is_none()
        );

        // Wrong id
        assert!(
            db.users()
                .find_by_identity_and_refresh_token(id + 1, "alice@example.com", "token-1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_cleared_refresh_token_never_matches() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.users().create("alice@example.com").await.unwrap();
        db.users().set_refresh_token(id, "token-1").await.unwrap();
        db.users().clear_refresh_token(id).await.unwrap();

        assert!(
            db.users()
                .find_by_identity_and_refresh_token(id, "alice@example.com", "token-1")
                .await
                .unwrap()
                .is_none()
        );
    }
}
