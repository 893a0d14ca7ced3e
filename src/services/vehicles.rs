use crate::{
    db::DbPool,
    entities::{personnel, vehicle},
    errors::ServiceError,
};
use chrono::{Days, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub brand: String,
    pub model: String,
    pub plate: String,
    pub year: Option<i32>,
    pub mileage_km: Option<i64>,
    pub fuel: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub inspection_expiry: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VehicleChanges {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub plate: Option<String>,
    pub year: Option<i32>,
    pub mileage_km: Option<i64>,
    pub fuel: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub inspection_expiry: Option<NaiveDate>,
    /// `Some(None)` unassigns the vehicle.
    pub assigned_to: Option<Option<Uuid>>,
    pub notes: Option<String>,
}

/// Plates are stored uppercase without spaces.
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
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

fn check_mileage(mileage: Option<i64>) -> Result<(), ServiceError> {
    if matches!(mileage, Some(km) if km < 0) {
        return Err(ServiceError::ValidationError(
            "mileage_km must not be negative".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_person<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ServiceError> {
    personnel::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("personnel", id))?;
    Ok(())
}

async fn ensure_plate_free<C: ConnectionTrait>(
    db: &C,
    plate: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = vehicle::Entity::find().filter(vehicle::Column::Plate.eq(plate));
    if let Some(id) = exclude {
        query = query.filter(vehicle::Column::Id.ne(id));
    }
    if query.count(db).await.map_err(ServiceError::db_error)? > 0 {
        return Err(ServiceError::Duplicate(format!(
            "plate {} is already registered",
            plate
        )));
    }
    Ok(())
}

/// Company vehicles (veicoli)
#[derive(Clone)]
pub struct VehicleService {
    db_pool: Arc<DbPool>,
}

impl VehicleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// With `expiring_within_days`, only vehicles whose insurance or
    /// inspection runs out by then (already expired included), soonest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        expiring_within_days: Option<u32>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<vehicle::Model>, u64), ServiceError> {
        let mut query = vehicle::Entity::find();
        match expiring_within_days {
            Some(days) => {
                let today = Utc::now().date_naive();
                let horizon = today
                    .checked_add_days(Days::new(u64::from(days)))
                    .unwrap_or(NaiveDate::MAX);
                query = query
                    .filter(
                        Condition::any()
                            .add(vehicle::Column::InsuranceExpiry.lte(horizon))
                            .add(vehicle::Column::InspectionExpiry.lte(horizon)),
                    )
                    .order_by_asc(vehicle::Column::InsuranceExpiry)
                    .order_by_asc(vehicle::Column::InspectionExpiry);
            }
            None => {
                query = query.order_by_asc(vehicle::Column::Plate);
            }
        }

        let paginator = query.paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let vehicles = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((vehicles, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<vehicle::Model, ServiceError> {
        vehicle::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("vehicle", id))
    }

    #[instrument(skip(self, input), fields(plate = %input.plate))]
    pub async fn create(&self, input: NewVehicle) -> Result<vehicle::Model, ServiceError> {
        let db = &*self.db_pool;
        let plate = normalize_plate(&required(&input.plate, "plate")?);
        check_mileage(input.mileage_km)?;
        ensure_plate_free(db, &plate, None).await?;
        if let Some(person) = input.assigned_to {
            ensure_person(db, person).await?;
        }

        let vehicle = vehicle::ActiveModel {
            id: Set(Uuid::new_v4()),
            brand: Set(required(&input.brand, "brand")?),
            model: Set(required(&input.model, "model")?),
            plate: Set(plate),
            year: Set(input.year),
            mileage_km: Set(input.mileage_km),
            fuel: Set(trimmed(input.fuel)),
            insurance_expiry: Set(input.insurance_expiry),
            inspection_expiry: Set(input.inspection_expiry),
            assigned_to: Set(input.assigned_to),
            notes: Set(trimmed(input.notes)),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(vehicle_id = %vehicle.id, "vehicle registered");
        Ok(vehicle)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: VehicleChanges,
    ) -> Result<vehicle::Model, ServiceError> {
        let db = &*self.db_pool;
        check_mileage(changes.mileage_km)?;
        let existing = self.get(id).await?;

        let mut active: vehicle::ActiveModel = existing.into();
        if let Some(brand) = changes.brand.as_deref() {
            active.brand = Set(required(brand, "brand")?);
        }
        if let Some(model) = changes.model.as_deref() {
            active.model = Set(required(model, "model")?);
        }
        if let Some(plate) = changes.plate.as_deref() {
            let plate = normalize_plate(&required(plate, "plate")?);
            ensure_plate_free(db, &plate, Some(id)).await?;
            active.plate = Set(plate);
        }
        if let Some(year) = changes.year {
            active.year = Set(Some(year));
        }
        if let Some(mileage) = changes.mileage_km {
            active.mileage_km = Set(Some(mileage));
        }
        if let Some(fuel) = changes.fuel {
            active.fuel = Set(trimmed(Some(fuel)));
        }
        if let Some(date) = changes.insurance_expiry {
            active.insurance_expiry = Set(Some(date));
        }
        if let Some(date) = changes.inspection_expiry {
            active.inspection_expiry = Set(Some(date));
        }
        if let Some(assigned_to) = changes.assigned_to {
            if let Some(person) = assigned_to {
                ensure_person(db, person).await?;
            }
            active.assigned_to = Set(assigned_to);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(trimmed(Some(notes)));
        }
        active.update(db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = vehicle::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("vehicle", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plates_are_normalized() {
        assert_eq!(normalize_plate(" ab 123 cd "), "AB123CD");
    }

    #[test]
    fn negative_mileage_is_rejected() {
        assert!(check_mileage(Some(-1)).is_err());
        assert!(check_mileage(None).is_ok());
        assert!(check_mileage(Some(120_000)).is_ok());
    }
}
