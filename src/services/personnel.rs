use crate::{
    db::DbPool,
    entities::{personnel, vehicle},
    errors::ServiceError,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct PersonnelFilter {
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PersonChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::ValidationError(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Personnel records (personale)
#[derive(Clone)]
pub struct PersonnelService {
    db_pool: Arc<DbPool>,
}

impl PersonnelService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: PersonnelFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<personnel::Model>, u64), ServiceError> {
        let mut query = personnel::Entity::find();
        if let Some(active) = filter.active {
            query = query.filter(personnel::Column::Active.eq(active));
        }
        if let Some(search) = trimmed(filter.search) {
            query = query.filter(
                Condition::any()
                    .add(personnel::Column::FirstName.contains(&search))
                    .add(personnel::Column::LastName.contains(&search))
                    .add(personnel::Column::Role.contains(&search)),
            );
        }

        let paginator = query
            .order_by_asc(personnel::Column::LastName)
            .order_by_asc(personnel::Column::FirstName)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let people = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((people, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<personnel::Model, ServiceError> {
        personnel::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("personnel", id))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewPerson) -> Result<personnel::Model, ServiceError> {
        let person = personnel::ActiveModel {
            id: Set(Uuid::new_v4()),
            first_name: Set(required(&input.first_name, "first_name")?),
            last_name: Set(required(&input.last_name, "last_name")?),
            role: Set(trimmed(input.role)),
            phone: Set(trimmed(input.phone)),
            email: Set(trimmed(input.email).map(|e| e.to_lowercase())),
            hire_date: Set(input.hire_date),
            active: Set(true),
            notes: Set(trimmed(input.notes)),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        info!(personnel_id = %person.id, "personnel record created");
        Ok(person)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: PersonChanges,
    ) -> Result<personnel::Model, ServiceError> {
        let existing = self.get(id).await?;
        let mut active: personnel::ActiveModel = existing.into();
        if let Some(first_name) = changes.first_name.as_deref() {
            active.first_name = Set(required(first_name, "first_name")?);
        }
        if let Some(last_name) = changes.last_name.as_deref() {
            active.last_name = Set(required(last_name, "last_name")?);
        }
        if let Some(role) = changes.role {
            active.role = Set(trimmed(Some(role)));
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(trimmed(Some(phone)));
        }
        if let Some(email) = changes.email {
            active.email = Set(trimmed(Some(email)).map(|e| e.to_lowercase()));
        }
        if let Some(hire_date) = changes.hire_date {
            active.hire_date = Set(Some(hire_date));
        }
        if let Some(flag) = changes.active {
            active.active = Set(flag);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(trimmed(Some(notes)));
        }
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Deactivate a person. Refused while a vehicle is still assigned to them.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<personnel::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get(id).await?;
        let vehicles = vehicle::Entity::find()
            .filter(vehicle::Column::AssignedTo.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if vehicles > 0 {
            return Err(ServiceError::Conflict(format!(
                "{} still has {} assigned vehicle(s)",
                existing.full_name(),
                vehicles
            )));
        }

        let mut active: personnel::ActiveModel = existing.into();
        active.active = Set(false);
        active.update(db).await.map_err(ServiceError::db_error)
    }
}
