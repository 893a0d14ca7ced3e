use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        machine::{self, MachineStatus, MachineType},
        site,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MachineFilter {
    pub site_id: Option<Uuid>,
    pub status: Option<MachineStatus>,
    pub has_issue: Option<bool>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewMachine {
    pub name: String,
    pub code: Option<String>,
    pub machine_type: Option<MachineType>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub plate: Option<String>,
    pub status: Option<MachineStatus>,
    pub notes: Option<String>,
    pub site_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct MachineChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub machine_type: Option<MachineType>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub plate: Option<String>,
    pub status: Option<MachineStatus>,
    pub notes: Option<String>,
    /// `Some(None)` moves the machine off site.
    pub site_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Note line appended for each reported issue.
pub fn issue_note_line(at: DateTime<Utc>, message: &str) -> String {
    format!("[Segnalazione {}] {}", at.format("%Y-%m-%d %H:%M"), message)
}

fn append_note(notes: Option<String>, line: &str) -> String {
    match notes.filter(|n| !n.trim().is_empty()) {
        Some(existing) => format!("{}\n{}", existing.trim_end(), line),
        None => line.to_string(),
    }
}

async fn ensure_site<C: ConnectionTrait>(db: &C, site_id: Uuid) -> Result<(), ServiceError> {
    site::Entity::find_by_id(site_id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("site", site_id))?;
    Ok(())
}

async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    code: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = machine::Entity::find().filter(machine::Column::Code.eq(code));
    if let Some(id) = exclude {
        query = query.filter(machine::Column::Id.ne(id));
    }
    if query.count(db).await.map_err(ServiceError::db_error)? > 0 {
        return Err(ServiceError::Duplicate(format!(
            "machine code {} already exists",
            code
        )));
    }
    Ok(())
}

/// Machines (macchinari)
#[derive(Clone)]
pub struct MachineService {
    db_pool: Arc<DbPool>,
}

impl MachineService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Machines with an open issue come first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: MachineFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<machine::Model>, u64), ServiceError> {
        let mut query = machine::Entity::find();
        if let Some(site_id) = filter.site_id {
            query = query.filter(machine::Column::SiteId.eq(site_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(machine::Column::Status.eq(status));
        }
        if let Some(has_issue) = filter.has_issue {
            query = query.filter(machine::Column::HasIssue.eq(has_issue));
        }
        if let Some(active) = filter.active {
            query = query.filter(machine::Column::IsActive.eq(active));
        }

        let paginator = query
            .order_by_desc(machine::Column::HasIssue)
            .order_by_asc(machine::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let machines = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((machines, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<machine::Model, ServiceError> {
        machine::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("machine", id))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewMachine) -> Result<machine::Model, ServiceError> {
        let db = &*self.db_pool;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "machine name must not be empty".to_string(),
            ));
        }
        let code = trimmed(input.code);
        if let Some(code) = code.as_deref() {
            ensure_code_free(db, code, None).await?;
        }
        if let Some(site_id) = input.site_id {
            ensure_site(db, site_id).await?;
        }

        let machine = machine::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            code: Set(code),
            machine_type: Set(input.machine_type),
            brand: Set(trimmed(input.brand)),
            model_name: Set(trimmed(input.model_name)),
            plate: Set(trimmed(input.plate)),
            status: Set(input.status.unwrap_or(MachineStatus::Attivo)),
            notes: Set(trimmed(input.notes)),
            site_id: Set(input.site_id),
            is_active: Set(true),
            has_issue: Set(false),
            current_issue: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(machine_id = %machine.id, "machine created");
        Ok(machine)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: MachineChanges,
    ) -> Result<machine::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get(id).await?;

        let mut active: machine::ActiveModel = existing.into();
        if let Some(name) = trimmed(changes.name) {
            active.name = Set(name);
        }
        if let Some(code) = changes.code {
            let code = trimmed(Some(code));
            if let Some(code) = code.as_deref() {
                ensure_code_free(db, code, Some(id)).await?;
            }
            active.code = Set(code);
        }
        if let Some(machine_type) = changes.machine_type {
            active.machine_type = Set(Some(machine_type));
        }
        if let Some(brand) = changes.brand {
            active.brand = Set(trimmed(Some(brand)));
        }
        if let Some(model_name) = changes.model_name {
            active.model_name = Set(trimmed(Some(model_name)));
        }
        if let Some(plate) = changes.plate {
            active.plate = Set(trimmed(Some(plate)));
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(trimmed(Some(notes)));
        }
        if let Some(site_id) = changes.site_id {
            if let Some(site_id) = site_id {
                ensure_site(db, site_id).await?;
            }
            active.site_id = Set(site_id);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Soft delete
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<machine::Model, ServiceError> {
        let existing = self.get(id).await?;
        let mut active: machine::ActiveModel = existing.into();
        active.is_active = Set(false);
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Flag a fault. The message is also appended to the machine notes.
    #[instrument(skip(self, user, message), fields(user_id = %user.user_id))]
    pub async fn report_issue(
        &self,
        user: &AuthUser,
        id: Uuid,
        message: &str,
    ) -> Result<machine::Model, ServiceError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ServiceError::ValidationError(
                "issue description must not be empty".to_string(),
            ));
        }
        let existing = self.get(id).await?;
        let line = issue_note_line(Utc::now(), message);
        let notes = append_note(existing.notes.clone(), &line);

        let mut active: machine::ActiveModel = existing.into();
        active.has_issue = Set(true);
        active.current_issue = Set(Some(message.to_string()));
        active.notes = Set(Some(notes));
        let machine = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        info!(machine_id = %id, reported_by = %user.user_id, "machine issue reported");
        Ok(machine)
    }

    #[instrument(skip(self))]
    pub async fn resolve_issue(&self, id: Uuid) -> Result<machine::Model, ServiceError> {
        let existing = self.get(id).await?;
        let mut active: machine::ActiveModel = existing.into();
        active.has_issue = Set(false);
        active.current_issue = Set(None);
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn count_with_issue(&self) -> Result<u64, ServiceError> {
        machine::Entity::find()
            .filter(machine::Column::HasIssue.eq(true))
            .filter(machine::Column::IsActive.eq(true))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn issue_lines_are_appended() {
        let at = Utc.with_ymd_and_hms(2025, 4, 2, 7, 30, 0).unwrap();
        let line = issue_note_line(at, "Perdita olio");
        assert_eq!(line, "[Segnalazione 2025-04-02 07:30] Perdita olio");
        assert_eq!(append_note(None, &line), line);
        assert_eq!(
            append_note(Some("Tagliando fatto\n".into()), &line),
            format!("Tagliando fatto\n{}", line)
        );
    }
}
