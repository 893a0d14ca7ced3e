use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        daily_report, fiche, machine,
        site::{self, SiteStatus},
        user, Role,
    },
    errors::{map_txn_error, ServiceError},
    services::{
        audit::{self, actions},
        notifications::{self, kinds, Recipient},
        warehouse::ledger::{self, OutboundTotal},
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Load a site the caller may see. Crew leaders only see their own sites:
/// an existing site assigned to someone else is 403, a missing one 404.
pub async fn accessible_site<C: ConnectionTrait>(
    db: &C,
    user: &AuthUser,
    site_id: Uuid,
) -> Result<site::Model, ServiceError> {
    let site = site::Entity::find_by_id(site_id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("site", site_id))?;

    if user.is_caposquadra() && site.caposquadra_id != Some(user.user_id) {
        return Err(ServiceError::Forbidden("site not assigned".to_string()));
    }
    Ok(site)
}

/// Ids of the sites assigned to a crew leader.
pub async fn assigned_site_ids<C: ConnectionTrait>(
    db: &C,
    caposquadra_id: Uuid,
) -> Result<Vec<Uuid>, ServiceError> {
    site::Entity::find()
        .select_only()
        .column(site::Column::Id)
        .filter(site::Column::CaposquadraId.eq(caposquadra_id))
        .into_tuple::<Uuid>()
        .all(db)
        .await
        .map_err(ServiceError::db_error)
}

#[derive(Debug, Clone, Default)]
pub struct SiteFilter {
    pub status: Option<SiteStatus>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSite {
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<SiteStatus>,
    pub caposquadra_id: Option<Uuid>,
    pub progress: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SiteChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<SiteStatus>,
    pub is_active: Option<bool>,
    /// `Some(None)` unassigns the crew leader.
    pub caposquadra_id: Option<Option<Uuid>>,
    pub progress: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SiteSummary {
    pub site: site::Model,
    pub report_count: u64,
    pub total_hours: Decimal,
    pub fiche_count: u64,
    pub machines: Vec<machine::Model>,
    pub outbound_totals: Vec<OutboundTotal>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ServiceError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ServiceError::ValidationError(
                "end_date must not precede start_date".to_string(),
            ));
        }
    }
    Ok(())
}

async fn ensure_caposquadra<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ServiceError> {
    let user = user::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("user", id))?;
    if user.role != Role::Caposquadra {
        return Err(ServiceError::ValidationError(format!(
            "user {} is not a caposquadra",
            id
        )));
    }
    Ok(())
}

async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    code: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = site::Entity::find().filter(site::Column::Code.eq(code));
    if let Some(id) = exclude {
        query = query.filter(site::Column::Id.ne(id));
    }
    let taken = query.count(db).await.map_err(ServiceError::db_error)?;
    if taken > 0 {
        return Err(ServiceError::Duplicate(format!("site code {} already exists", code)));
    }
    Ok(())
}

/// Construction sites (cantieri)
#[derive(Clone)]
pub struct SiteService {
    db_pool: Arc<DbPool>,
}

impl SiteService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &AuthUser,
        filter: SiteFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<site::Model>, u64), ServiceError> {
        let mut query = site::Entity::find();
        if user.is_caposquadra() {
            query = query.filter(site::Column::CaposquadraId.eq(user.user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(site::Column::Status.eq(status));
        }
        if let Some(active) = filter.active {
            query = query.filter(site::Column::IsActive.eq(active));
        }
        if let Some(search) = blank_to_none(filter.search) {
            query = query.filter(
                Condition::any()
                    .add(site::Column::Name.contains(&search))
                    .add(site::Column::Code.contains(&search)),
            );
        }

        let paginator = query
            .order_by_asc(site::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let sites = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((sites, total))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<site::Model, ServiceError> {
        accessible_site(&*self.db_pool, user, id).await
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.user_id))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: NewSite,
    ) -> Result<site::Model, ServiceError> {
        check_dates(input.start_date, input.end_date)?;
        let actor_id = actor.user_id;

        let site = self
            .db_pool
            .transaction::<_, site::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let code = blank_to_none(input.code);
                    if let Some(code) = code.as_deref() {
                        ensure_code_free(txn, code, None).await?;
                    }
                    if let Some(capo) = input.caposquadra_id {
                        ensure_caposquadra(txn, capo).await?;
                    }

                    let site = site::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(input.name.trim().to_string()),
                        code: Set(code),
                        address: Set(blank_to_none(input.address)),
                        city: Set(blank_to_none(input.city)),
                        country: Set(
                            blank_to_none(input.country).unwrap_or_else(|| "France".to_string())
                        ),
                        start_date: Set(input.start_date),
                        end_date: Set(input.end_date),
                        status: Set(input.status.unwrap_or(SiteStatus::Aperto)),
                        is_active: Set(true),
                        caposquadra_id: Set(input.caposquadra_id),
                        progress: Set(input.progress.unwrap_or(0).clamp(0, 100)),
                        description: Set(blank_to_none(input.description)),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    audit::record(
                        txn,
                        Some(actor_id),
                        actions::SITE_CREATE,
                        "site",
                        Some(site.id.to_string()),
                        Some(json!({ "name": site.name })),
                    )
                    .await?;
                    Ok(site)
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(site_id = %site.id, "site created");
        Ok(site)
    }

    /// Update a site. A status change notifies managers and admins (except
    /// the actor) and the assigned crew leader.
    #[instrument(skip(self, actor, changes), fields(actor_id = %actor.user_id))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: Uuid,
        changes: SiteChanges,
    ) -> Result<site::Model, ServiceError> {
        let actor_id = actor.user_id;

        self.db_pool
            .transaction::<_, site::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = site::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("site", id))?;
                    let old_status = existing.status;

                    check_dates(
                        changes.start_date.or(existing.start_date),
                        changes.end_date.or(existing.end_date),
                    )?;

                    let mut active: site::ActiveModel = existing.into();
                    if let Some(name) = blank_to_none(changes.name) {
                        active.name = Set(name);
                    }
                    if let Some(code) = changes.code {
                        let code = blank_to_none(Some(code));
                        if let Some(code) = code.as_deref() {
                            ensure_code_free(txn, code, Some(id)).await?;
                        }
                        active.code = Set(code);
                    }
                    if let Some(address) = changes.address {
                        active.address = Set(blank_to_none(Some(address)));
                    }
                    if let Some(city) = changes.city {
                        active.city = Set(blank_to_none(Some(city)));
                    }
                    if let Some(country) = blank_to_none(changes.country) {
                        active.country = Set(country);
                    }
                    if let Some(start) = changes.start_date {
                        active.start_date = Set(Some(start));
                    }
                    if let Some(end) = changes.end_date {
                        active.end_date = Set(Some(end));
                    }
                    if let Some(status) = changes.status {
                        active.status = Set(status);
                    }
                    if let Some(is_active) = changes.is_active {
                        active.is_active = Set(is_active);
                    }
                    if let Some(capo) = changes.caposquadra_id {
                        if let Some(capo) = capo {
                            ensure_caposquadra(txn, capo).await?;
                        }
                        active.caposquadra_id = Set(capo);
                    }
                    if let Some(progress) = changes.progress {
                        active.progress = Set(progress.clamp(0, 100));
                    }
                    if let Some(description) = changes.description {
                        active.description = Set(blank_to_none(Some(description)));
                    }

                    let site = active.update(txn).await.map_err(ServiceError::db_error)?;

                    if site.status != old_status {
                        let managers = notifications::management_user_ids(txn).await?;
                        notifications::notify_users(
                            txn,
                            &managers,
                            kinds::SITE_STATUS_CHANGED,
                            &format!(
                                "Stato cantiere {} aggiornato: {} → {}.",
                                site.name,
                                old_status.as_str(),
                                site.status.as_str()
                            ),
                            Some(format!("/api/v1/sites/{}", site.id)),
                            Some(actor_id),
                        )
                        .await?;
                        if let Some(capo) = site.caposquadra_id.filter(|c| *c != actor_id) {
                            notifications::notify(
                                txn,
                                Recipient::User(capo),
                                kinds::SITE_STATUS_CHANGED,
                                format!(
                                    "Lo stato del tuo cantiere {} è cambiato: {} → {}.",
                                    site.name,
                                    old_status.as_str(),
                                    site.status.as_str()
                                ),
                                Some(format!("/api/v1/sites/{}", site.id)),
                            )
                            .await?;
                        }
                    }

                    audit::record(
                        txn,
                        Some(actor_id),
                        actions::SITE_UPDATE,
                        "site",
                        Some(id.to_string()),
                        Some(json!({ "status": site.status })),
                    )
                    .await?;
                    Ok(site)
                })
            })
            .await
            .map_err(map_txn_error)
    }

    /// Soft delete
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> Result<site::Model, ServiceError> {
        let actor_id = actor.user_id;
        self.db_pool
            .transaction::<_, site::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = site::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("site", id))?;
                    let mut active: site::ActiveModel = existing.into();
                    active.is_active = Set(false);
                    let site = active.update(txn).await.map_err(ServiceError::db_error)?;
                    audit::record(
                        txn,
                        Some(actor_id),
                        actions::SITE_DELETE,
                        "site",
                        Some(id.to_string()),
                        None,
                    )
                    .await?;
                    Ok(site)
                })
            })
            .await
            .map_err(map_txn_error)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn summary(&self, user: &AuthUser, id: Uuid) -> Result<SiteSummary, ServiceError> {
        let db = &*self.db_pool;
        let site = accessible_site(db, user, id).await?;

        let report_count = daily_report::Entity::find()
            .filter(daily_report::Column::SiteId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let total_hours: Decimal = daily_report::Entity::find()
            .select_only()
            .column(daily_report::Column::TotalHours)
            .filter(daily_report::Column::SiteId.eq(id))
            .into_tuple::<Decimal>()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .sum();
        let fiche_count = fiche::Entity::find()
            .filter(fiche::Column::SiteId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let machines = machine::Entity::find()
            .filter(machine::Column::SiteId.eq(id))
            .filter(machine::Column::IsActive.eq(true))
            .order_by_asc(machine::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let outbound_totals = ledger::outbound_totals(db, Some(id)).await?;

        Ok(SiteSummary {
            site,
            report_count,
            total_hours,
            fiche_count,
            machines,
            outbound_totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(blank_to_none(Some("  ".into())), None);
        assert_eq!(blank_to_none(Some(" A1 ".into())), Some("A1".to_string()));
        assert_eq!(blank_to_none(None), None);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1);
        let end = NaiveDate::from_ymd_opt(2025, 4, 1);
        assert!(check_dates(start, end).is_err());
        assert!(check_dates(end, start).is_ok());
        assert!(check_dates(None, end).is_ok());
    }
}
