use crate::{db::DbPool, entities::audit_log, errors::ServiceError};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Audit action names
pub mod actions {
    pub const USER_CREATE: &str = "user_create";
    pub const USER_UPDATE: &str = "user_update";
    pub const USER_DEACTIVATE: &str = "user_deactivate";
    pub const SITE_CREATE: &str = "site_create";
    pub const SITE_UPDATE: &str = "site_update";
    pub const SITE_DELETE: &str = "site_delete";
    pub const CATEGORY_DELETE: &str = "category_delete";
    pub const ITEM_DEACTIVATE: &str = "item_deactivate";
    pub const REQUEST_APPROVE: &str = "request_approve";
    pub const REQUEST_FULFIL: &str = "request_fulfil";
    pub const REQUEST_REJECT: &str = "request_reject";
    pub const FICHE_DELETE: &str = "fiche_delete";
}

/// Append an audit row on any connection, including an open transaction.
pub async fn record<C: ConnectionTrait>(
    db: &C,
    actor: Option<Uuid>,
    action: &str,
    target_type: &str,
    target_id: Option<String>,
    extra_data: Option<Value>,
) -> Result<audit_log::Model, ServiceError> {
    debug!(action, target_type, ?target_id, "audit");
    audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor),
        action: Set(action.to_string()),
        target_type: Set(target_type.to_string()),
        target_id: Set(target_id),
        extra_data: Set(extra_data),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(ServiceError::db_error)
}

#[derive(Debug, Default, Clone)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub target_type: Option<String>,
}

/// Read side of the audit trail
#[derive(Clone)]
pub struct AuditService {
    db_pool: Arc<DbPool>,
}

impl AuditService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: AuditLogFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<audit_log::Model>, u64), ServiceError> {
        let mut query = audit_log::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(audit_log::Column::UserId.eq(user_id));
        }
        if let Some(action) = filter.action.filter(|a| !a.is_empty()) {
            query = query.filter(audit_log::Column::Action.eq(action));
        }
        if let Some(target_type) = filter.target_type.filter(|t| !t.is_empty()) {
            query = query.filter(audit_log::Column::TargetType.eq(target_type));
        }

        let paginator = query
            .order_by_desc(audit_log::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((rows, total))
    }
}
