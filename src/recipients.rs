//! Alert recipient lookup
//!
//! Recipients are the distinct emails of users holding a session that has
//! not expired yet. The monitor only ever mails the first one returned.

use async_trait::async_trait;

use crate::storage::StorageResult;

#[async_trait]
pub trait RecipientLookup: Send + Sync {
    /// Distinct email addresses of currently active users.
    async fn active_recipients(&self) -> StorageResult<Vec<String>>;
}

/// Fixed recipient list taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRecipients(pub Vec<String>);

#[async_trait]
impl RecipientLookup for StaticRecipients {
    async fn active_recipients(&self) -> StorageResult<Vec<String>> {
        let mut seen = Vec::with_capacity(self.0.len());
        for email in &self.0 {
            if !seen.contains(email) {
                seen.push(email.clone());
            }
        }
        Ok(seen)
    }
}

#[cfg(feature = "storage-sqlite")]
pub use session::SessionRecipients;

#[cfg(feature = "storage-sqlite")]
mod session {
    use async_trait::async_trait;
    use chrono::Utc;
    use sqlx::{Pool, Sqlite};
    use tracing::debug;

    use super::RecipientLookup;
    use crate::storage::StorageResult;

    /// Joins live sessions against their users in the SQLite store.
    #[derive(Clone)]
    pub struct SessionRecipients {
        pool: Pool<Sqlite>,
    }

    impl SessionRecipients {
        pub fn new(pool: Pool<Sqlite>) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl RecipientLookup for SessionRecipients {
        async fn active_recipients(&self) -> StorageResult<Vec<String>> {
            let now = Utc::now().timestamp_millis();

            let emails: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT u.email
                FROM sessions s
                JOIN users u ON u.id = s.user_id
                WHERE s.expires_at > ?
                GROUP BY u.email
                ORDER BY MIN(s.created_at), u.email
                "#,
            )
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

            debug!("{} active recipients", emails.len());
            Ok(emails)
        }
    }
}
