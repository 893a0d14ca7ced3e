use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::daily_report,
    errors::{map_txn_error, ServiceError},
    services::{
        notifications::{self, kinds, Recipient},
        sites::{accessible_site, assigned_site_ids},
    },
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub site_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub date: Option<NaiveDate>,
    pub site_id: Uuid,
    pub total_hours: Decimal,
    pub workers_count: i32,
    pub machines_used: Option<String>,
    pub activities: Option<String>,
    pub notes: Option<String>,
    pub weather: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Daily site reports (rapportini)
#[derive(Clone)]
pub struct DailyReportService {
    db_pool: Arc<DbPool>,
}

impl DailyReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// File a report. Managers and admins other than the author are
    /// notified, and so is the site's crew leader when someone else wrote it.
    #[instrument(
        skip(self, author, input),
        fields(author_id = %author.user_id, site_id = %input.site_id)
    )]
    pub async fn create(
        &self,
        author: &AuthUser,
        input: NewReport,
    ) -> Result<daily_report::Model, ServiceError> {
        if input.total_hours < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "total_hours must not be negative".to_string(),
            ));
        }
        if input.workers_count < 0 {
            return Err(ServiceError::ValidationError(
                "workers_count must not be negative".to_string(),
            ));
        }
        let author = author.clone();

        let report = self
            .db_pool
            .transaction::<_, daily_report::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let site = accessible_site(txn, &author, input.site_id).await?;

                    let report = daily_report::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        date: Set(input.date.unwrap_or_else(|| Utc::now().date_naive())),
                        site_id: Set(site.id),
                        total_hours: Set(input.total_hours),
                        workers_count: Set(input.workers_count),
                        machines_used: Set(trimmed(input.machines_used)),
                        activities: Set(trimmed(input.activities)),
                        notes: Set(trimmed(input.notes)),
                        weather: Set(trimmed(input.weather)),
                        created_by: Set(author.user_id),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let url = format!("/api/v1/reports/{}", report.id);
                    let managers = notifications::management_user_ids(txn).await?;
                    notifications::notify_users(
                        txn,
                        &managers,
                        kinds::REPORT_CREATED,
                        &format!(
                            "Nuovo rapportino da {} per {}.",
                            author.display_name(),
                            site.name
                        ),
                        Some(url.clone()),
                        Some(author.user_id),
                    )
                    .await?;
                    if let Some(capo) = site.caposquadra_id.filter(|c| *c != author.user_id) {
                        notifications::notify(
                            txn,
                            Recipient::User(capo),
                            kinds::REPORT_CREATED,
                            format!("Nuovo rapportino per il cantiere {}.", site.name),
                            Some(url),
                        )
                        .await?;
                    }
                    Ok(report)
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(report_id = %report.id, "daily report created");
        Ok(report)
    }

    /// Crew leaders see reports of their own sites only.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &AuthUser,
        filter: ReportFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<daily_report::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = daily_report::Entity::find();
        if user.is_caposquadra() {
            if let Some(site_id) = filter.site_id {
                accessible_site(db, user, site_id).await?;
            }
            let sites = assigned_site_ids(db, user.user_id).await?;
            query = query.filter(daily_report::Column::SiteId.is_in(sites));
        }
        if let Some(site_id) = filter.site_id {
            query = query.filter(daily_report::Column::SiteId.eq(site_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(daily_report::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(daily_report::Column::Date.lte(to));
        }

        let paginator = query
            .order_by_desc(daily_report::Column::Date)
            .order_by_desc(daily_report::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let reports = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((reports, total))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn get(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> Result<daily_report::Model, ServiceError> {
        let db = &*self.db_pool;
        let report = daily_report::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("daily report", id))?;
        if user.is_caposquadra() {
            accessible_site(db, user, report.site_id).await?;
        }
        Ok(report)
    }
}
