use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{daily_report, notification, site, user, Role},
    errors::ServiceError,
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: u64 = 20;
pub const MAX_LIST_LIMIT: u64 = 50;
pub const POLL_LIMIT: u64 = 5;

/// Notification type tags
pub mod kinds {
    pub const REPORT_CREATED: &str = "report_created";
    pub const SITE_STATUS_CHANGED: &str = "site_status_changed";
    pub const WAREHOUSE_REQUEST: &str = "magazzino_richiesta";
    pub const WAREHOUSE_REQUEST_UPDATED: &str = "magazzino_richiesta_aggiornata";
    pub const MISSING_REPORT: &str = "rapportino";
    pub const MANUAL: &str = "manual";
}

/// Who receives a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    User(Uuid),
    Role(Role),
}

impl Recipient {
    /// Exactly one of user or role must be given.
    pub fn from_parts(user_id: Option<Uuid>, role: Option<Role>) -> Result<Self, ServiceError> {
        match (user_id, role) {
            (Some(user_id), None) => Ok(Recipient::User(user_id)),
            (None, Some(role)) => Ok(Recipient::Role(role)),
            (None, None) => Err(ServiceError::ValidationError(
                "a notification needs a recipient user or role".to_string(),
            )),
            (Some(_), Some(_)) => Err(ServiceError::ValidationError(
                "a notification targets either a user or a role, not both".to_string(),
            )),
        }
    }
}

/// Insert one notification on any connection, including an open transaction.
pub async fn notify<C: ConnectionTrait>(
    db: &C,
    recipient: Recipient,
    kind: &str,
    message: impl Into<String>,
    target_url: Option<String>,
) -> Result<notification::Model, ServiceError> {
    let (recipient_user_id, recipient_role) = match recipient {
        Recipient::User(id) => (Some(id), None),
        Recipient::Role(role) => (None, Some(role)),
    };
    notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        recipient_user_id: Set(recipient_user_id),
        recipient_role: Set(recipient_role),
        notification_type: Set(kind.to_string()),
        message: Set(message.into()),
        target_url: Set(target_url),
        is_read: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(ServiceError::db_error)
}

/// Notify each user in turn, skipping `exclude` (usually the actor).
pub async fn notify_users<C: ConnectionTrait>(
    db: &C,
    user_ids: &[Uuid],
    kind: &str,
    message: &str,
    target_url: Option<String>,
    exclude: Option<Uuid>,
) -> Result<usize, ServiceError> {
    let mut created = 0;
    for user_id in user_ids.iter().copied() {
        if Some(user_id) == exclude {
            continue;
        }
        notify(db, Recipient::User(user_id), kind, message, target_url.clone()).await?;
        created += 1;
    }
    Ok(created)
}

/// Active managers and admins.
pub async fn management_user_ids<C: ConnectionTrait>(db: &C) -> Result<Vec<Uuid>, ServiceError> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::IsActive.eq(true))
        .filter(user::Column::Role.is_in([Role::Manager, Role::Admin]))
        .into_tuple::<Uuid>()
        .all(db)
        .await
        .map_err(ServiceError::db_error)
}

/// Active users holding `inventory.manage`.
pub async fn warehouse_manager_ids<C: ConnectionTrait>(db: &C) -> Result<Vec<Uuid>, ServiceError> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(
                    user::Column::Role
                        .is_in(crate::auth::warehouse_manager_roles().collect::<Vec<_>>()),
                )
                .add(
                    Condition::all()
                        .add(user::Column::Role.eq(Role::Manager))
                        .add(user::Column::IsWarehouseManager.eq(true)),
                ),
        )
        .into_tuple::<Uuid>()
        .all(db)
        .await
        .map_err(ServiceError::db_error)
}

/// Message reminding a crew leader to file today's report, in their language.
pub fn missing_report_message(language: &str, site_name: &str, today: NaiveDate) -> String {
    match language {
        "fr" => format!(
            "Pense à remplir le rapport journalier d'aujourd'hui ({}) pour le chantier '{}'.",
            today, site_name
        ),
        _ => format!(
            "Ricorda di compilare il rapportino di oggi ({}) per il cantiere '{}'.",
            today, site_name
        ),
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationFeed {
    pub items: Vec<notification::Model>,
    pub unread_count: u64,
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub recipient_user_id: Option<Uuid>,
    pub recipient_role: Option<Role>,
    pub notification_type: Option<String>,
    pub message: String,
    pub target_url: Option<String>,
}

/// Per-user and per-role notification feed
#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DbPool>,
    retention_days: i64,
}

impl NotificationService {
    pub fn new(db_pool: Arc<DbPool>, retention_days: i64) -> Self {
        Self {
            db_pool,
            retention_days,
        }
    }

    fn scope(user: &AuthUser) -> Condition {
        Condition::any()
            .add(notification::Column::RecipientUserId.eq(user.user_id))
            .add(notification::Column::RecipientRole.eq(user.role))
    }

    fn retention_floor(&self) -> chrono::DateTime<Utc> {
        Utc::now() - Duration::days(self.retention_days.max(1))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn unread_count(&self, user: &AuthUser) -> Result<u64, ServiceError> {
        notification::Entity::find()
            .filter(Self::scope(user))
            .filter(notification::Column::IsRead.eq(false))
            .filter(notification::Column::CreatedAt.gte(self.retention_floor()))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Newest first, limited to the retention window; `limit` is clamped to 1..=50.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &AuthUser,
        unread_only: bool,
        limit: Option<u64>,
    ) -> Result<NotificationFeed, ServiceError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

        let mut query = notification::Entity::find()
            .filter(Self::scope(user))
            .filter(notification::Column::CreatedAt.gte(self.retention_floor()));
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        let items = query
            .order_by_desc(notification::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        let unread_count = self.unread_count(user).await?;

        Ok(NotificationFeed {
            items,
            unread_count,
        })
    }

    /// Unread count plus the latest few notifications.
    pub async fn poll(&self, user: &AuthUser) -> Result<NotificationFeed, ServiceError> {
        self.list(user, false, Some(POLL_LIMIT)).await
    }

    /// Flip one notification to read. Rows outside the caller's scope are 404.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn mark_read(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> Result<notification::Model, ServiceError> {
        let db = &*self.db_pool;
        let row = notification::Entity::find_by_id(id)
            .filter(Self::scope(user))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("notification", id))?;

        if row.is_read {
            return Ok(row);
        }

        let mut active: notification::ActiveModel = row.into();
        active.is_read = Set(true);
        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Mark every unread notification in the caller's scope as read.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn mark_all_read(&self, user: &AuthUser) -> Result<u64, ServiceError> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(Self::scope(user))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(result.rows_affected)
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateNotification,
    ) -> Result<notification::Model, ServiceError> {
        let recipient = Recipient::from_parts(input.recipient_user_id, input.recipient_role)?;
        if input.message.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "message must not be empty".to_string(),
            ));
        }

        let db = &*self.db_pool;
        if let Recipient::User(user_id) = recipient {
            user::Entity::find_by_id(user_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::not_found("user", user_id))?;
        }

        let kind = input
            .notification_type
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| kinds::MANUAL.to_string());
        notify(db, recipient, &kind, input.message.trim(), input.target_url).await
    }

    /// Remind every active crew leader about each open site without a report for `today`.
    /// Returns the number of reminders created.
    #[instrument(skip(self))]
    pub async fn send_missing_report_reminders(
        &self,
        today: NaiveDate,
    ) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        let leaders = user::Entity::find()
            .filter(user::Column::Role.eq(Role::Caposquadra))
            .filter(user::Column::IsActive.eq(true))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut created = 0u64;
        for leader in leaders {
            let sites = site::Entity::find()
                .filter(site::Column::CaposquadraId.eq(leader.id))
                .filter(site::Column::IsActive.eq(true))
                .filter(site::Column::Status.ne(site::SiteStatus::Chiuso))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;

            for site in sites {
                let reports_today = daily_report::Entity::find()
                    .filter(daily_report::Column::SiteId.eq(site.id))
                    .filter(daily_report::Column::Date.eq(today))
                    .count(db)
                    .await
                    .map_err(ServiceError::db_error)?;
                if reports_today > 0 {
                    continue;
                }

                notify(
                    db,
                    Recipient::User(leader.id),
                    kinds::MISSING_REPORT,
                    missing_report_message(&leader.language, &site.name, today),
                    Some(format!("/api/v1/sites/{}", site.id)),
                )
                .await?;
                created += 1;
            }
        }

        info!(created, %today, "missing report reminders sent");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn recipient_requires_exactly_one_target() {
        let id = Uuid::new_v4();
        assert_eq!(
            Recipient::from_parts(Some(id), None).unwrap(),
            Recipient::User(id)
        );
        assert_eq!(
            Recipient::from_parts(None, Some(Role::Manager)).unwrap(),
            Recipient::Role(Role::Manager)
        );
        assert_matches!(
            Recipient::from_parts(None, None),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            Recipient::from_parts(Some(id), Some(Role::Hr)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn reminder_language_follows_user() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let fr = missing_report_message("fr", "Lyon Nord", today);
        assert!(fr.starts_with("Pense à remplir"));
        assert!(fr.contains("2025-03-14"));
        let it = missing_report_message("it", "Lyon Nord", today);
        assert!(it.starts_with("Ricorda di compilare"));
        assert!(missing_report_message("de", "X", today).starts_with("Ricorda"));
    }
}
