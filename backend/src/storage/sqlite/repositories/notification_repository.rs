use crate::error::{LedgerError, Result};
use crate::storage::db::DbConnection;
use crate::storage::sqlite::{datetime_col, json_col, json_text, opt_datetime_col};
use crate::storage::traits::NotificationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Notification, NotificationStatus, NotificationType};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const NOTIFICATION_COLUMNS: &str = "id, user_id, notification_type, title, message, \
     status, metadata, created_at, read_at";

/// Repository for notification operations
#[derive(Clone)]
pub struct NotificationRepository {
    db: DbConnection,
}

impl NotificationRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

fn map_notification(row: &SqliteRow) -> Result<Notification> {
    let notification_type: String = row.get("notification_type");
    let status: String = row.get("status");
    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        notification_type: NotificationType::parse(&notification_type).ok_or_else(|| {
            LedgerError::Decode(format!("notification_type: {notification_type}"))
        })?,
        title: row.get("title"),
        message: row.get("message"),
        status: NotificationStatus::parse(&status)
            .ok_or_else(|| LedgerError::Decode(format!("status: {status}")))?,
        metadata: json_col(row, "metadata")?,
        created_at: datetime_col(row, "created_at")?,
        read_at: opt_datetime_col(row, "read_at")?,
    })
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn store_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, notification_type, title, message, status,
                 metadata, created_at, read_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(notification.notification_type.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.status.as_str())
        .bind(json_text(&notification.metadata))
        .bind(notification.created_at.to_rfc3339())
        .bind(notification.read_at.map(|d| d.to_rfc3339()))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn get_notification(&self, notification_id: &str) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(notification_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_notification(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<Notification>> {
        let mut sql =
            format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ?");
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query(&sql).bind(user_id);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(self.db.pool()).await?;
        rows.iter().map(map_notification).collect()
    }

    async fn unread_count(&self, user_id: &str) -> Result<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE user_id = ? AND status = 'UNREAD'",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn mark_read(&self, notification_id: &str, now: DateTime<Utc>) -> Result<Notification> {
        let result = sqlx::query("UPDATE notifications SET status = 'READ', read_at = ? WHERE id = ?")
            .bind(now.to_rfc3339())
            .bind(notification_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("notification", notification_id));
        }

        self.get_notification(notification_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("notification", notification_id))
    }

    async fn mark_all_read(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'READ', read_at = ? \
             WHERE user_id = ? AND status = 'UNREAD'",
        )
        .bind(now.to_rfc3339())
        .bind(user_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(notification_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
