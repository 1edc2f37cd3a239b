//! Database repository for API tokens.
//!
//! Each user has at most one token. It is created the first time the user authenticates with
//! their credentials and returned unchanged on every later request.

use crate::{
    crypto::generate_token,
    db::{errors::Result, models::users::UserDBResponse},
    types::UserId,
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Tokens<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Tokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Return the user's token, creating one if they don't have one yet
    #[instrument(skip(self), err)]
    pub async fn get_or_create_for_user(&mut self, user_id: UserId) -> Result<String> {
        // ON CONFLICT keeps concurrent first logins from creating two tokens
        sqlx::query("INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
            .bind(generate_token())
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        let key: String = sqlx::query_scalar("SELECT key FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(key)
    }

    /// Resolve a token to its user
    #[instrument(skip_all, err)]
    pub async fn get_user_by_key(&mut self, key: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            SELECT u.*
            FROM auth_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn count_for_user(&mut self, user_id: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}
