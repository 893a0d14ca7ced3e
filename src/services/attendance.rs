//! Weekly attendance sheet (presenze): one row per person and day.

use crate::{
    db::DbPool,
    entities::{
        personnel,
        personnel_attendance::{self, AttendanceStatus},
        site,
    },
    errors::{map_txn_error, ServiceError},
};
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const MAX_DAILY_HOURS: Decimal = dec!(24);

#[derive(Debug, Clone)]
pub struct AttendanceEntry {
    pub status: AttendanceStatus,
    pub site_id: Option<Uuid>,
    pub hours: Option<Decimal>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AttendanceWeek {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub entries: Vec<personnel_attendance::Model>,
}

/// Monday and Sunday of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> Result<(NaiveDate, NaiveDate), ServiceError> {
    let offset = u64::from(day.weekday().num_days_from_monday());
    let out_of_range = || ServiceError::ValidationError("date out of range".to_string());
    let start = day.checked_sub_days(Days::new(offset)).ok_or_else(out_of_range)?;
    let end = start.checked_add_days(Days::new(6)).ok_or_else(out_of_range)?;
    Ok((start, end))
}

fn check_hours(hours: Option<Decimal>) -> Result<(), ServiceError> {
    match hours {
        Some(h) if h < Decimal::ZERO || h > MAX_DAILY_HOURS => Err(ServiceError::ValidationError(
            "hours must be between 0 and 24".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct AttendanceService {
    db_pool: Arc<DbPool>,
}

impl AttendanceService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Entries of the Monday-to-Sunday week containing `day`, by date.
    #[instrument(skip(self))]
    pub async fn week(
        &self,
        day: NaiveDate,
        personnel_id: Option<Uuid>,
    ) -> Result<AttendanceWeek, ServiceError> {
        let (week_start, week_end) = week_bounds(day)?;
        let mut query = personnel_attendance::Entity::find()
            .filter(personnel_attendance::Column::AttendanceDate.between(week_start, week_end));
        if let Some(personnel_id) = personnel_id {
            query = query.filter(personnel_attendance::Column::PersonnelId.eq(personnel_id));
        }
        let entries = query
            .order_by_asc(personnel_attendance::Column::AttendanceDate)
            .order_by_asc(personnel_attendance::Column::PersonnelId)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(AttendanceWeek {
            week_start,
            week_end,
            entries,
        })
    }

    /// Creates or replaces the entry for `personnel_id` on `date`.
    #[instrument(skip(self, entry))]
    pub async fn upsert(
        &self,
        personnel_id: Uuid,
        date: NaiveDate,
        entry: AttendanceEntry,
    ) -> Result<personnel_attendance::Model, ServiceError> {
        check_hours(entry.hours)?;
        let note = entry
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let saved = self
            .db_pool
            .transaction::<_, personnel_attendance::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    personnel::Entity::find_by_id(personnel_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("personnel", personnel_id))?;
                    if let Some(site_id) = entry.site_id {
                        site::Entity::find_by_id(site_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| ServiceError::not_found("site", site_id))?;
                    }

                    let existing = personnel_attendance::Entity::find()
                        .filter(personnel_attendance::Column::PersonnelId.eq(personnel_id))
                        .filter(personnel_attendance::Column::AttendanceDate.eq(date))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut active: personnel_attendance::ActiveModel = match existing {
                        Some(row) => row.into(),
                        None => personnel_attendance::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            personnel_id: Set(personnel_id),
                            attendance_date: Set(date),
                            ..Default::default()
                        },
                    };
                    active.status = Set(entry.status);
                    active.site_id = Set(entry.site_id);
                    active.hours = Set(entry.hours);
                    active.note = Set(note);
                    active.save(txn).await.map_err(ServiceError::db_error)?;

                    personnel_attendance::Entity::find()
                        .filter(personnel_attendance::Column::PersonnelId.eq(personnel_id))
                        .filter(personnel_attendance::Column::AttendanceDate.eq(date))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::InternalError("attendance row vanished".to_string())
                        })
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(
            personnel_id = %saved.personnel_id,
            date = %saved.attendance_date,
            "attendance saved"
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2025-06-04 is a Wednesday
        assert_eq!(
            week_bounds(date(2025, 6, 4)).unwrap(),
            (date(2025, 6, 2), date(2025, 6, 8))
        );
        assert_eq!(
            week_bounds(date(2025, 6, 2)).unwrap(),
            (date(2025, 6, 2), date(2025, 6, 8))
        );
        assert_eq!(
            week_bounds(date(2025, 6, 8)).unwrap(),
            (date(2025, 6, 2), date(2025, 6, 8))
        );
        // across a month boundary
        assert_eq!(
            week_bounds(date(2025, 7, 1)).unwrap(),
            (date(2025, 6, 30), date(2025, 7, 6))
        );
    }

    #[test]
    fn hours_outside_a_day_are_rejected() {
        assert!(check_hours(None).is_ok());
        assert!(check_hours(Some(dec!(0))).is_ok());
        assert!(check_hours(Some(dec!(24))).is_ok());
        assert_matches!(check_hours(Some(dec!(24.5))), Err(ServiceError::ValidationError(_)));
        assert_matches!(check_hours(Some(dec!(-1))), Err(ServiceError::ValidationError(_)));
    }
}
