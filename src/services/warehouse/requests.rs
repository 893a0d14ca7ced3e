use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        warehouse_item, warehouse_movement::MovementType,
        warehouse_request::{self, RequestStatus},
        warehouse_request_line,
    },
    errors::{map_txn_error, ServiceError},
    services::{
        audit::{self, actions},
        notifications::{self, kinds, Recipient},
        sites::accessible_site,
        warehouse::ledger::{self, NewMovement},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Status filter value that lists requests in every state.
pub const ALL_STATUSES: &str = "tutte";

#[derive(Debug, Clone)]
pub struct NewRequestLine {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub site_id: Option<Uuid>,
    pub note: Option<String>,
    pub lines: Vec<NewRequestLine>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestLineView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub unit: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone)]
pub struct RequestDetail {
    pub request: warehouse_request::Model,
    pub lines: Vec<RequestLineView>,
}

/// Manager-side status filter: absent means pending, `tutte` means all,
/// anything unrecognised falls back to pending.
pub fn parse_status_filter(value: Option<&str>) -> Option<RequestStatus> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Some(RequestStatus::InAttesa),
        Some(v) if v.eq_ignore_ascii_case(ALL_STATUSES) => None,
        Some(v) => Some(
            RequestStatus::from_str(&v.to_lowercase()).unwrap_or(RequestStatus::InAttesa),
        ),
    }
}

/// Sum quantities of repeated items. Every quantity must be positive.
fn merge_lines(lines: &[NewRequestLine]) -> Result<BTreeMap<Uuid, Decimal>, ServiceError> {
    let mut merged = BTreeMap::new();
    for line in lines {
        if line.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "every requested quantity must be greater than zero".to_string(),
            ));
        }
        *merged.entry(line.item_id).or_insert(Decimal::ZERO) += line.quantity;
    }
    if merged.is_empty() {
        return Err(ServiceError::ValidationError(
            "a request needs at least one line".to_string(),
        ));
    }
    Ok(merged)
}

fn status_label(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::InAttesa => "in attesa",
        RequestStatus::Approvata => "approvata",
        RequestStatus::Evasa => "evasa",
        RequestStatus::Rifiutata => "rifiutata",
    }
}

fn request_url(id: Uuid) -> String {
    format!("/api/v1/warehouse/requests/{}", id)
}

async fn load_lines<C: ConnectionTrait>(
    db: &C,
    request_id: Uuid,
) -> Result<Vec<(warehouse_request_line::Model, warehouse_item::Model)>, ServiceError> {
    let rows = warehouse_request_line::Entity::find()
        .filter(warehouse_request_line::Column::RequestId.eq(request_id))
        .find_also_related(warehouse_item::Entity)
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    rows.into_iter()
        .map(|(line, item)| {
            item.map(|item| (line.clone(), item)).ok_or_else(|| {
                ServiceError::InternalError(format!("request line {} has no item", line.id))
            })
        })
        .collect()
}

fn line_views(
    rows: &[(warehouse_request_line::Model, warehouse_item::Model)],
) -> Vec<RequestLineView> {
    rows.iter()
        .map(|(line, item)| RequestLineView {
            id: line.id,
            item_id: item.id,
            item_code: item.code.clone(),
            item_name: item.name.clone(),
            unit: item.unit.clone(),
            quantity: line.quantity,
        })
        .collect()
}

async fn load_request<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<warehouse_request::Model, ServiceError> {
    warehouse_request::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("warehouse request", id))
}

/// Every line must be covered by the current balance.
async fn check_coverage<C: ConnectionTrait>(
    db: &C,
    rows: &[(warehouse_request_line::Model, warehouse_item::Model)],
) -> Result<(), ServiceError> {
    let ids: Vec<Uuid> = rows.iter().map(|(_, item)| item.id).collect();
    let balances = ledger::balances(db, &ids).await?;
    for (line, item) in rows {
        let available = balances.get(&item.id).copied().unwrap_or_default();
        if available < line.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "{}: available {} {}, requested {}",
                item.name, available, item.unit, line.quantity
            )));
        }
    }
    Ok(())
}

/// Record who handled the request and tell the requester.
async fn settle<C: ConnectionTrait>(
    db: &C,
    request: warehouse_request::Model,
    next: RequestStatus,
    handler_id: Uuid,
    reply: Option<String>,
) -> Result<warehouse_request::Model, ServiceError> {
    let reply = reply.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    let mut active: warehouse_request::ActiveModel = request.into();
    active.status = Set(next);
    active.handled_by = Set(Some(handler_id));
    active.handled_at = Set(Some(Utc::now()));
    active.read_by_requester = Set(false);
    if reply.is_some() || next != RequestStatus::Evasa {
        active.manager_reply = Set(reply);
    }
    let updated = active.update(db).await.map_err(ServiceError::db_error)?;

    let mut message = format!(
        "La tua richiesta magazzino è stata {}.",
        status_label(updated.status)
    );
    if let Some(reply) = updated.manager_reply.as_deref() {
        message.push_str(&format!(" Risposta: {}", reply));
    }
    notifications::notify(
        db,
        Recipient::User(updated.requester_id),
        kinds::WAREHOUSE_REQUEST_UPDATED,
        message,
        Some(request_url(updated.id)),
    )
    .await?;
    Ok(updated)
}

/// Warehouse withdrawal requests (richieste)
#[derive(Clone)]
pub struct RequestService {
    db_pool: Arc<DbPool>,
}

impl RequestService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Raise a request. Repeated items are merged; every item must exist and
    /// be active. Warehouse managers are notified.
    #[instrument(skip(self, user, input), fields(user_id = %user.user_id))]
    pub async fn create(
        &self,
        user: &AuthUser,
        input: NewRequest,
    ) -> Result<RequestDetail, ServiceError> {
        let merged = merge_lines(&input.lines)?;
        let requester = user.clone();

        let detail = self
            .db_pool
            .transaction::<_, RequestDetail, ServiceError>(|txn| {
                Box::pin(async move {
                    if let Some(site_id) = input.site_id {
                        accessible_site(txn, &requester, site_id).await?;
                    }

                    let items: HashMap<Uuid, warehouse_item::Model> = warehouse_item::Entity::find()
                        .filter(warehouse_item::Column::Id.is_in(merged.keys().copied()))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .into_iter()
                        .map(|item| (item.id, item))
                        .collect();
                    for item_id in merged.keys() {
                        match items.get(item_id) {
                            Some(item) if item.is_active => {}
                            _ => {
                                return Err(ServiceError::BadRequest(format!(
                                    "item {} is not available",
                                    item_id
                                )))
                            }
                        }
                    }

                    let request = warehouse_request::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        requester_id: Set(requester.user_id),
                        site_id: Set(input.site_id),
                        status: Set(RequestStatus::InAttesa),
                        note: Set(input
                            .note
                            .map(|n| n.trim().to_string())
                            .filter(|n| !n.is_empty())),
                        manager_reply: Set(None),
                        handled_by: Set(None),
                        handled_at: Set(None),
                        read_by_requester: Set(true),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let mut lines = Vec::with_capacity(merged.len());
                    for (item_id, quantity) in merged {
                        let line = warehouse_request_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            request_id: Set(request.id),
                            item_id: Set(item_id),
                            quantity: Set(quantity),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                        if let Some(item) = items.get(&item_id) {
                            lines.push((line, item.clone()));
                        }
                    }

                    let managers = notifications::warehouse_manager_ids(txn).await?;
                    notifications::notify_users(
                        txn,
                        &managers,
                        kinds::WAREHOUSE_REQUEST,
                        &format!(
                            "Nuova richiesta magazzino da {}.",
                            requester.display_name()
                        ),
                        Some(request_url(request.id)),
                        Some(requester.user_id),
                    )
                    .await?;

                    Ok(RequestDetail {
                        lines: line_views(&lines),
                        request,
                    })
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(
            request_id = %detail.request.id,
            lines = detail.lines.len(),
            "warehouse request created"
        );
        Ok(detail)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list_mine(
        &self,
        user: &AuthUser,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<warehouse_request::Model>, u64), ServiceError> {
        let paginator = warehouse_request::Entity::find()
            .filter(warehouse_request::Column::RequesterId.eq(user.user_id))
            .order_by_desc(warehouse_request::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((rows, total))
    }

    /// `status` of `None` lists every state.
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        status: Option<RequestStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<warehouse_request::Model>, u64), ServiceError> {
        let mut query = warehouse_request::Entity::find();
        if let Some(status) = status {
            query = query.filter(warehouse_request::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(warehouse_request::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((rows, total))
    }

    /// Visible to the requester and to warehouse managers.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<RequestDetail, ServiceError> {
        let db = &*self.db_pool;
        let request = load_request(db, id).await?;
        if request.requester_id != user.user_id && !user.can_manage_warehouse() {
            return Err(ServiceError::Forbidden(
                "request belongs to another user".to_string(),
            ));
        }
        let rows = load_lines(db, id).await?;
        Ok(RequestDetail {
            request,
            lines: line_views(&rows),
        })
    }

    #[instrument(skip(self, user, reply), fields(user_id = %user.user_id))]
    pub async fn approve(
        &self,
        user: &AuthUser,
        id: Uuid,
        reply: Option<String>,
    ) -> Result<RequestDetail, ServiceError> {
        let handler_id = user.user_id;
        self.db_pool
            .transaction::<_, RequestDetail, ServiceError>(|txn| {
                Box::pin(async move {
                    let request = load_request(txn, id).await?;
                    if !request.status.can_transition_to(RequestStatus::Approvata) {
                        return Err(ServiceError::Conflict(format!(
                            "request is {}, only pending requests can be approved",
                            request.status
                        )));
                    }
                    let rows = load_lines(txn, id).await?;
                    check_coverage(txn, &rows).await?;

                    let request =
                        settle(txn, request, RequestStatus::Approvata, handler_id, reply).await?;
                    audit::record(
                        txn,
                        Some(handler_id),
                        actions::REQUEST_APPROVE,
                        "warehouse_request",
                        Some(id.to_string()),
                        None,
                    )
                    .await?;
                    Ok(RequestDetail {
                        request,
                        lines: line_views(&rows),
                    })
                })
            })
            .await
            .map_err(map_txn_error)
    }

    /// Book one outbound movement per line and close the request. Any
    /// failing line rolls the whole fulfilment back.
    #[instrument(skip(self, user, reply), fields(user_id = %user.user_id))]
    pub async fn fulfil(
        &self,
        user: &AuthUser,
        id: Uuid,
        reply: Option<String>,
    ) -> Result<RequestDetail, ServiceError> {
        let handler_id = user.user_id;
        let detail = self
            .db_pool
            .transaction::<_, RequestDetail, ServiceError>(|txn| {
                Box::pin(async move {
                    let request = load_request(txn, id).await?;
                    if request.status != RequestStatus::Approvata {
                        return Err(ServiceError::Conflict(format!(
                            "request is {}, only approved requests can be fulfilled",
                            request.status
                        )));
                    }
                    let rows = load_lines(txn, id).await?;
                    for (line, item) in &rows {
                        if !item.is_active {
                            return Err(ServiceError::BadRequest(format!(
                                "item {} is not available",
                                item.code
                            )));
                        }
                        ledger::record_movement(
                            txn,
                            handler_id,
                            NewMovement {
                                item_id: item.id,
                                movement_type: MovementType::Outbound,
                                quantity: line.quantity,
                                site_id: request.site_id,
                                note: None,
                                request_id: Some(request.id),
                            },
                        )
                        .await?;
                    }

                    let request =
                        settle(txn, request, RequestStatus::Evasa, handler_id, reply).await?;
                    audit::record(
                        txn,
                        Some(handler_id),
                        actions::REQUEST_FULFIL,
                        "warehouse_request",
                        Some(id.to_string()),
                        Some(json!({ "lines": rows.len() })),
                    )
                    .await?;
                    Ok(RequestDetail {
                        request,
                        lines: line_views(&rows),
                    })
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(request_id = %id, "warehouse request fulfilled");
        Ok(detail)
    }

    #[instrument(skip(self, user, reply), fields(user_id = %user.user_id))]
    pub async fn reject(
        &self,
        user: &AuthUser,
        id: Uuid,
        reply: Option<String>,
    ) -> Result<RequestDetail, ServiceError> {
        let handler_id = user.user_id;
        self.db_pool
            .transaction::<_, RequestDetail, ServiceError>(|txn| {
                Box::pin(async move {
                    let request = load_request(txn, id).await?;
                    if !request.status.can_transition_to(RequestStatus::Rifiutata) {
                        return Err(ServiceError::Conflict(format!(
                            "request is {} and can no longer be rejected",
                            request.status
                        )));
                    }
                    let rows = load_lines(txn, id).await?;
                    let request =
                        settle(txn, request, RequestStatus::Rifiutata, handler_id, reply).await?;
                    audit::record(
                        txn,
                        Some(handler_id),
                        actions::REQUEST_REJECT,
                        "warehouse_request",
                        Some(id.to_string()),
                        None,
                    )
                    .await?;
                    Ok(RequestDetail {
                        request,
                        lines: line_views(&rows),
                    })
                })
            })
            .await
            .map_err(map_txn_error)
    }

    /// Requester acknowledges the latest update.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn mark_read(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> Result<warehouse_request::Model, ServiceError> {
        let db = &*self.db_pool;
        let request = load_request(db, id).await?;
        if request.requester_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "only the requester can mark a request as read".to_string(),
            ));
        }
        if request.read_by_requester {
            return Ok(request);
        }
        let mut active: warehouse_request::ActiveModel = request.into();
        active.read_by_requester = Set(true);
        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Pending requests: all of them, or only the caller's own.
    pub async fn pending_count(&self, requester: Option<Uuid>) -> Result<u64, ServiceError> {
        let mut query = warehouse_request::Entity::find()
            .filter(warehouse_request::Column::Status.eq(RequestStatus::InAttesa));
        if let Some(requester) = requester {
            query = query.filter(warehouse_request::Column::RequesterId.eq(requester));
        }
        query
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn duplicate_lines_are_merged() {
        let bolt = Uuid::new_v4();
        let nut = Uuid::new_v4();
        let merged = merge_lines(&[
            NewRequestLine { item_id: bolt, quantity: dec!(2) },
            NewRequestLine { item_id: nut, quantity: dec!(1.5) },
            NewRequestLine { item_id: bolt, quantity: dec!(3) },
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&bolt], dec!(5));
        assert_eq!(merged[&nut], dec!(1.5));
    }

    #[test]
    fn empty_or_non_positive_lines_are_rejected() {
        assert_matches!(merge_lines(&[]), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            merge_lines(&[NewRequestLine { item_id: Uuid::new_v4(), quantity: dec!(0) }]),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn status_filter_defaults_to_pending() {
        assert_eq!(parse_status_filter(None), Some(RequestStatus::InAttesa));
        assert_eq!(parse_status_filter(Some("tutte")), None);
        assert_eq!(parse_status_filter(Some("TUTTE")), None);
        assert_eq!(parse_status_filter(Some("evasa")), Some(RequestStatus::Evasa));
        assert_eq!(parse_status_filter(Some("boh")), Some(RequestStatus::InAttesa));
    }
}
