//! Management reports over a date range: hours per site, per crew leader and
//! machine usage, as JSON rows or CSV exports.

use crate::{
    db::DbPool,
    entities::{
        daily_report,
        fiche::{self, FicheType},
        machine, site, user, Role,
    },
    errors::ServiceError,
};
use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ActiveEnum, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportPreset {
    /// The last fourteen days including today
    LastTwoWeeks,
    CurrentMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    Sites,
    CrewLeaders,
    Machines,
}

impl ReportKind {
    fn file_stem(self) -> &'static str {
        match self {
            ReportKind::Sites => "cantieri",
            ReportKind::CrewLeaders => "caposquadra",
            ReportKind::Machines => "mezzi",
        }
    }
}

/// Inclusive date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

fn month_of(day: NaiveDate) -> ReportPeriod {
    let first = day
        .checked_sub_days(Days::new(u64::from(day.day0())))
        .unwrap_or(day);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(day);
    ReportPeriod {
        from: first,
        to: last,
    }
}

/// Explicit dates win over the preset. A lone `from` runs to today, a lone
/// `to` covers that single day, nothing at all means the current month.
/// Reversed bounds are swapped.
pub fn resolve_period(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    preset: Option<ReportPreset>,
    today: NaiveDate,
) -> ReportPeriod {
    let (start, end) = match (from, to, preset) {
        (Some(from), Some(to), _) => (from, to),
        (Some(from), None, _) => (from, today),
        (None, Some(to), _) => (to, to),
        (None, None, Some(ReportPreset::LastTwoWeeks)) => {
            (today.checked_sub_days(Days::new(13)).unwrap_or(today), today)
        }
        (None, None, Some(ReportPreset::CurrentMonth) | None) => {
            let month = month_of(today);
            (month.from, month.to)
        }
    };
    if start > end {
        ReportPeriod {
            from: end,
            to: start,
        }
    } else {
        ReportPeriod {
            from: start,
            to: end,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteReportRow {
    pub site_id: Uuid,
    pub site_name: String,
    pub site_code: Option<String>,
    pub site_status: site::SiteStatus,
    pub total_hours: Decimal,
    pub reports_count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CrewLeaderReportRow {
    pub user_id: Uuid,
    pub name: String,
    /// Active sites currently assigned
    pub active_sites: u64,
    pub total_hours: Decimal,
    pub reports_count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MachineReportRow {
    pub machine_id: Uuid,
    pub machine_name: String,
    pub machine_code: Option<String>,
    pub machine_status: machine::MachineStatus,
    /// Distinct days with at least one fiche on this machine
    pub usage_days: u64,
    /// Downtime and inspection fiches
    pub downtime_count: u64,
}

/// A rendered CSV file and its download name.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: Vec<u8>,
}

pub fn export_filename(kind: ReportKind, period: &ReportPeriod) -> String {
    format!(
        "report_{}_{}_{}.csv",
        kind.file_stem(),
        period.from.format("%Y%m%d"),
        period.to.format("%Y%m%d")
    )
}

fn render_csv<I>(headers: &[&str], rows: I) -> Result<Vec<u8>, ServiceError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let csv_error = |e: csv::Error| ServiceError::InternalError(format!("csv export: {}", e));
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers).map_err(csv_error)?;
    for row in rows {
        writer.write_record(&row).map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| ServiceError::InternalError(format!("csv export: {}", e)))
}

pub fn sites_csv(rows: &[SiteReportRow]) -> Result<Vec<u8>, ServiceError> {
    render_csv(
        &["site_name", "site_code", "site_status", "total_hours", "reports_count"],
        rows.iter().map(|r| {
            vec![
                r.site_name.clone(),
                r.site_code.clone().unwrap_or_default(),
                r.site_status.as_str().to_string(),
                r.total_hours.to_string(),
                r.reports_count.to_string(),
            ]
        }),
    )
}

pub fn crew_leaders_csv(rows: &[CrewLeaderReportRow]) -> Result<Vec<u8>, ServiceError> {
    render_csv(
        &["capo_name", "active_sites", "total_hours", "reports_count"],
        rows.iter().map(|r| {
            vec![
                r.name.clone(),
                r.active_sites.to_string(),
                r.total_hours.to_string(),
                r.reports_count.to_string(),
            ]
        }),
    )
}

pub fn machines_csv(rows: &[MachineReportRow]) -> Result<Vec<u8>, ServiceError> {
    render_csv(
        &["machine_name", "machine_code", "machine_status", "usage_days", "downtime_count"],
        rows.iter().map(|r| {
            vec![
                r.machine_name.clone(),
                r.machine_code.clone().unwrap_or_else(|| "-".to_string()),
                r.machine_status.to_value(),
                r.usage_days.to_string(),
                r.downtime_count.to_string(),
            ]
        }),
    )
}

#[derive(Default)]
struct HoursTally {
    hours: Decimal,
    reports: u64,
}

#[derive(Clone)]
pub struct ReportingService {
    db_pool: Arc<DbPool>,
}

impl ReportingService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// (grouping key, hours) of every daily report in the period.
    async fn report_hours(
        &self,
        key: daily_report::Column,
        period: &ReportPeriod,
    ) -> Result<HashMap<Uuid, HoursTally>, ServiceError> {
        let rows = daily_report::Entity::find()
            .select_only()
            .column(key)
            .column(daily_report::Column::TotalHours)
            .filter(daily_report::Column::Date.between(period.from, period.to))
            .into_tuple::<(Uuid, Decimal)>()
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let mut tallies: HashMap<Uuid, HoursTally> = HashMap::new();
        for (id, hours) in rows {
            let tally = tallies.entry(id).or_default();
            tally.hours += hours;
            tally.reports += 1;
        }
        Ok(tallies)
    }

    /// Active sites by name with the hours reported on them.
    #[instrument(skip(self))]
    pub async fn sites(&self, period: &ReportPeriod) -> Result<Vec<SiteReportRow>, ServiceError> {
        let sites = site::Entity::find()
            .filter(site::Column::IsActive.eq(true))
            .order_by_asc(site::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        let mut tallies = self.report_hours(daily_report::Column::SiteId, period).await?;

        Ok(sites
            .into_iter()
            .map(|s| {
                let tally = tallies.remove(&s.id).unwrap_or_default();
                SiteReportRow {
                    site_id: s.id,
                    site_name: s.name,
                    site_code: s.code,
                    site_status: s.status,
                    total_hours: tally.hours.normalize(),
                    reports_count: tally.reports,
                }
            })
            .collect())
    }

    /// Every crew leader account with assigned sites and the hours they reported.
    #[instrument(skip(self))]
    pub async fn crew_leaders(
        &self,
        period: &ReportPeriod,
    ) -> Result<Vec<CrewLeaderReportRow>, ServiceError> {
        let db = &*self.db_pool;
        let leaders = user::Entity::find()
            .filter(user::Column::Role.eq(Role::Caposquadra))
            .order_by_asc(user::Column::FullName)
            .order_by_asc(user::Column::Email)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let assigned = site::Entity::find()
            .select_only()
            .column(site::Column::CaposquadraId)
            .filter(site::Column::IsActive.eq(true))
            .filter(site::Column::CaposquadraId.is_not_null())
            .into_tuple::<Uuid>()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let mut site_counts: HashMap<Uuid, u64> = HashMap::new();
        for leader_id in assigned {
            *site_counts.entry(leader_id).or_insert(0) += 1;
        }

        let mut tallies = self
            .report_hours(daily_report::Column::CreatedBy, period)
            .await?;

        Ok(leaders
            .into_iter()
            .map(|u| {
                let tally = tallies.remove(&u.id).unwrap_or_default();
                CrewLeaderReportRow {
                    user_id: u.id,
                    name: u.display_name().to_string(),
                    active_sites: site_counts.get(&u.id).copied().unwrap_or(0),
                    total_hours: tally.hours.normalize(),
                    reports_count: tally.reports,
                }
            })
            .collect())
    }

    /// Active machines by name with usage days and downtime fiches.
    #[instrument(skip(self))]
    pub async fn machines(
        &self,
        period: &ReportPeriod,
    ) -> Result<Vec<MachineReportRow>, ServiceError> {
        let db = &*self.db_pool;
        let machines = machine::Entity::find()
            .filter(machine::Column::IsActive.eq(true))
            .order_by_asc(machine::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let fiches = fiche::Entity::find()
            .select_only()
            .column(fiche::Column::MachineId)
            .column(fiche::Column::Date)
            .column(fiche::Column::FicheType)
            .filter(fiche::Column::MachineId.is_not_null())
            .filter(fiche::Column::Date.between(period.from, period.to))
            .into_tuple::<(Uuid, NaiveDate, FicheType)>()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut usage: HashMap<Uuid, (BTreeSet<NaiveDate>, u64)> = HashMap::new();
        for (machine_id, date, fiche_type) in fiches {
            let (days, downtime) = usage.entry(machine_id).or_default();
            days.insert(date);
            if matches!(fiche_type, FicheType::FermoMacchina | FicheType::Controllo) {
                *downtime += 1;
            }
        }

        Ok(machines
            .into_iter()
            .map(|m| {
                let (days, downtime) = usage.remove(&m.id).unwrap_or_default();
                MachineReportRow {
                    machine_id: m.id,
                    machine_name: m.name,
                    machine_code: m.code,
                    machine_status: m.status,
                    usage_days: days.len() as u64,
                    downtime_count: downtime,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn export_csv(
        &self,
        kind: ReportKind,
        period: &ReportPeriod,
    ) -> Result<CsvExport, ServiceError> {
        let body = match kind {
            ReportKind::Sites => sites_csv(&self.sites(period).await?)?,
            ReportKind::CrewLeaders => crew_leaders_csv(&self.crew_leaders(period).await?)?,
            ReportKind::Machines => machines_csv(&self.machines(period).await?)?,
        };
        let filename = export_filename(kind, period);
        info!(%filename, bytes = body.len(), "report exported");
        Ok(CsvExport { filename, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(from: NaiveDate, to: NaiveDate) -> ReportPeriod {
        ReportPeriod { from, to }
    }

    #[rstest]
    #[case::explicit_range(
        Some(date(2025, 3, 1)),
        Some(date(2025, 3, 10)),
        None,
        period(date(2025, 3, 1), date(2025, 3, 10))
    )]
    #[case::dates_beat_preset(
        Some(date(2025, 3, 1)),
        Some(date(2025, 3, 10)),
        Some(ReportPreset::LastTwoWeeks),
        period(date(2025, 3, 1), date(2025, 3, 10))
    )]
    #[case::reversed_is_swapped(
        Some(date(2025, 3, 10)),
        Some(date(2025, 3, 1)),
        None,
        period(date(2025, 3, 1), date(2025, 3, 10))
    )]
    #[case::from_only_runs_to_today(
        Some(date(2025, 6, 1)),
        None,
        None,
        period(date(2025, 6, 1), date(2025, 6, 18))
    )]
    #[case::to_only_is_one_day(
        None,
        Some(date(2025, 6, 3)),
        None,
        period(date(2025, 6, 3), date(2025, 6, 3))
    )]
    #[case::last_two_weeks(
        None,
        None,
        Some(ReportPreset::LastTwoWeeks),
        period(date(2025, 6, 5), date(2025, 6, 18))
    )]
    #[case::current_month(
        None,
        None,
        Some(ReportPreset::CurrentMonth),
        period(date(2025, 6, 1), date(2025, 6, 30))
    )]
    #[case::default_is_current_month(
        None,
        None,
        None,
        period(date(2025, 6, 1), date(2025, 6, 30))
    )]
    fn resolves_report_period(
        #[case] from: Option<NaiveDate>,
        #[case] to: Option<NaiveDate>,
        #[case] preset: Option<ReportPreset>,
        #[case] expected: ReportPeriod,
    ) {
        assert_eq!(resolve_period(from, to, preset, date(2025, 6, 18)), expected);
    }

    #[test]
    fn current_month_handles_february_and_december() {
        assert_eq!(
            resolve_period(None, None, None, date(2024, 2, 10)),
            period(date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            resolve_period(None, None, None, date(2025, 12, 31)),
            period(date(2025, 12, 1), date(2025, 12, 31))
        );
    }

    #[test]
    fn export_filename_carries_kind_and_range() {
        let p = period(date(2025, 6, 1), date(2025, 6, 30));
        assert_eq!(
            export_filename(ReportKind::Sites, &p),
            "report_cantieri_20250601_20250630.csv"
        );
        assert_eq!(
            export_filename(ReportKind::CrewLeaders, &p),
            "report_caposquadra_20250601_20250630.csv"
        );
        assert_eq!(
            export_filename(ReportKind::Machines, &p),
            "report_mezzi_20250601_20250630.csv"
        );
    }

    #[test]
    fn site_csv_quotes_fields_with_commas() {
        let rows = vec![SiteReportRow {
            site_id: Uuid::new_v4(),
            site_name: "Nîmes, lotto 2".to_string(),
            site_code: None,
            site_status: site::SiteStatus::Aperto,
            total_hours: dec!(15.5),
            reports_count: 2,
        }];
        let csv = String::from_utf8(sites_csv(&rows).unwrap()).unwrap();
        assert_eq!(
            csv,
            "site_name,site_code,site_status,total_hours,reports_count\n\
             \"Nîmes, lotto 2\",,aperto,15.5,2\n"
        );
    }

    #[test]
    fn machine_csv_marks_missing_code() {
        let rows = vec![MachineReportRow {
            machine_id: Uuid::new_v4(),
            machine_name: "Trivella".to_string(),
            machine_code: None,
            machine_status: machine::MachineStatus::Manutenzione,
            usage_days: 3,
            downtime_count: 1,
        }];
        let csv = String::from_utf8(machines_csv(&rows).unwrap()).unwrap();
        assert_eq!(
            csv,
            "machine_name,machine_code,machine_status,usage_days,downtime_count\n\
             Trivella,-,manutenzione,3,1\n"
        );
    }
}
