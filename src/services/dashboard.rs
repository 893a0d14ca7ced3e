use crate::{
    auth::{consts, AuthUser},
    db::DbPool,
    entities::{site, Role},
    errors::ServiceError,
    services::{
        machines::MachineService, notifications::NotificationService,
        warehouse::{LedgerService, RequestService},
    },
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Role-aware counters for the landing page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub role: Role,
    pub open_sites: u64,
    pub machines_with_issue: u64,
    /// Only for users who can read the inventory.
    pub under_threshold_items: Option<u64>,
    /// All pending requests for warehouse managers, the caller's own otherwise.
    pub pending_requests: u64,
    pub unread_notifications: u64,
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
    machines: Arc<MachineService>,
    ledger: Arc<LedgerService>,
    requests: Arc<RequestService>,
    notifications: Arc<NotificationService>,
}

impl DashboardService {
    pub fn new(
        db_pool: Arc<DbPool>,
        machines: Arc<MachineService>,
        ledger: Arc<LedgerService>,
        requests: Arc<RequestService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_pool,
            machines,
            ledger,
            requests,
            notifications,
        }
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn summary(&self, user: &AuthUser) -> Result<DashboardSummary, ServiceError> {
        let mut sites = site::Entity::find()
            .filter(site::Column::IsActive.eq(true))
            .filter(site::Column::Status.eq(site::SiteStatus::Aperto));
        if user.is_caposquadra() {
            sites = sites.filter(site::Column::CaposquadraId.eq(user.user_id));
        }
        let open_sites = sites
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let under_threshold_items = if user.has_permission(consts::INVENTORY_READ) {
            Some(self.ledger.under_threshold().await?.len() as u64)
        } else {
            None
        };

        let pending_requests = if user.can_manage_warehouse() {
            self.requests.pending_count(None).await?
        } else {
            self.requests.pending_count(Some(user.user_id)).await?
        };

        Ok(DashboardSummary {
            role: user.role,
            open_sites,
            machines_with_issue: self.machines.count_with_issue().await?,
            under_threshold_items,
            pending_requests,
            unread_notifications: self.notifications.unread_count(user).await?,
        })
    }
}
