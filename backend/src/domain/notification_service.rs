use crate::domain::commands::notifications::{EmitNotificationCommand, NotificationListQuery};
use crate::error::{LedgerError, Result};
use crate::storage::sqlite::NotificationRepository;
use crate::storage::traits::NotificationStore;
use crate::storage::DbConnection;
use chrono::Utc;
use shared::{Notification, NotificationStatus};
use std::sync::Arc;

/// Creates and manages user-facing notifications. Delivery beyond the store
/// is not this service's concern; callers treat emission as fire-and-forget.
#[derive(Clone)]
pub struct NotificationService {
    notification_repository: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(connection: Arc<DbConnection>) -> Self {
        Self {
            notification_repository: Arc::new(NotificationRepository::new((*connection).clone())),
        }
    }

    pub async fn emit(&self, command: EmitNotificationCommand) -> Result<Notification> {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: command.user_id,
            notification_type: command.notification_type,
            title: command.title,
            message: command.message,
            status: NotificationStatus::Unread,
            metadata: command.metadata,
            created_at: Utc::now(),
            read_at: None,
        };

        self.notification_repository
            .store_notification(&notification)
            .await?;
        Ok(notification)
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        query: NotificationListQuery,
    ) -> Result<Vec<Notification>> {
        self.notification_repository
            .list_notifications(user_id, query.status)
            .await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64> {
        self.notification_repository.unread_count(user_id).await
    }

    pub async fn mark_as_read(&self, notification_id: &str) -> Result<Notification> {
        self.notification_repository
            .mark_read(notification_id, Utc::now())
            .await
    }

    /// Mark every unread notification of the user as read; returns how many
    /// were flipped.
    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<u64> {
        self.notification_repository
            .mark_all_read(user_id, Utc::now())
            .await
    }

    pub async fn delete_notification(&self, notification_id: &str) -> Result<bool> {
        self.notification_repository
            .delete_notification(notification_id)
            .await
    }

    pub async fn get_notification(&self, notification_id: &str) -> Result<Notification> {
        self.notification_repository
            .get_notification(notification_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("notification", notification_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::NotificationType;

    async fn create_test_service() -> NotificationService {
        let connection = Arc::new(DbConnection::init_test().await.unwrap());
        sqlx::query("INSERT INTO users (id, email, name, created_at) VALUES ('u1', 'u1@example.com', 'U One', '2024-01-01T00:00:00+00:00')")
            .execute(connection.pool())
            .await
            .unwrap();
        NotificationService::new(connection)
    }

    fn emit_command() -> EmitNotificationCommand {
        EmitNotificationCommand {
            user_id: "u1".to_string(),
            notification_type: NotificationType::Security,
            title: "New login".to_string(),
            message: "A new device signed in".to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_emit_starts_unread() {
        let service = create_test_service().await;
        let notification = service.emit(emit_command()).await.unwrap();
        assert_eq!(notification.status, NotificationStatus::Unread);
        assert!(notification.read_at.is_none());
        assert_eq!(service.unread_count("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_as_read_counts() {
        let service = create_test_service().await;
        service.emit(emit_command()).await.unwrap();
        service.emit(emit_command()).await.unwrap();

        assert_eq!(service.mark_all_as_read("u1").await.unwrap(), 2);
        assert_eq!(service.unread_count("u1").await.unwrap(), 0);
    }
}
