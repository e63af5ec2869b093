use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::User;

/// Signals a unique-constraint hit on the e-mail column, regardless of the
/// backing store.
#[derive(Debug, thiserror::Error)]
#[error("e-mail already in use")]
pub struct DuplicateEmail;

/// Persistence operations on user records. `count` and `delete_all` exist
/// for test truncation and table-count assertions.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new, inactive user holding an activation token. A duplicate
    /// e-mail surfaces as [`DuplicateEmail`].
    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        activation_token: &str,
    ) -> anyhow::Result<User>;

    /// Find a user by email, active or not.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Activate the user holding the given token, clearing the token in the
    /// same operation. Returns `None` when no user holds the token, which
    /// also covers stale tokens of already-activated users.
    async fn activate_by_token(&self, token: &str) -> anyhow::Result<Option<User>>;

    /// Remove a user row. Only used to roll back a signup whose activation
    /// e-mail could not be delivered.
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;

    async fn count(&self) -> anyhow::Result<i64>;

    async fn delete_all(&self) -> anyhow::Result<()>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        activation_token: &str,
    ) -> anyhow::Result<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, activation_token, inactive)
            VALUES ($1, $2, $3, $4, true)
            RETURNING id, username, email, password_hash, activation_token, inactive, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(activation_token)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e)
                if e.as_database_error()
                    .map(|db| db.is_unique_violation())
                    .unwrap_or(false) =>
            {
                Err(anyhow::Error::new(DuplicateEmail))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, activation_token, inactive, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn activate_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET inactive = false, activation_token = NULL
            WHERE activation_token = $1
            RETURNING id, username, email, password_hash, activation_token, inactive, created_at
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn delete_all(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users").execute(&self.db).await?;
        Ok(())
    }
}

/// In-memory store backing the unit suite, with the same duplicate-email
/// semantics as the Postgres constraint.
#[cfg(test)]
pub struct InMemoryUserStore {
    rows: std::sync::Mutex<Vec<User>>,
}

#[cfg(test)]
impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            rows: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        activation_token: &str,
    ) -> anyhow::Result<User> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == email) {
            return Err(anyhow::Error::new(DuplicateEmail));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            activation_token: Some(activation_token.to_string()),
            inactive: true,
            created_at: time::OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn activate_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|u| u.activation_token.as_deref() == Some(token))
        {
            Some(user) => {
                user.inactive = false;
                user.activation_token = None;
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.rows.lock().unwrap().retain(|u| u.id != id);
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }

    async fn delete_all(&self) -> anyhow::Result<()> {
        self.rows.lock().unwrap().clear();
        Ok(())
    }
}
