pub mod audit_logs;
pub mod common;
pub mod dashboard;
pub mod fiches;
pub mod machines;
pub mod notifications;
pub mod personnel;
pub mod reporting;
pub mod reports;
pub mod sites;
pub mod users;
pub mod vehicles;
pub mod warehouse;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        attendance::AttendanceService,
        audit::AuditService,
        dashboard::DashboardService,
        fiches::FicheService,
        machines::MachineService,
        notifications::NotificationService,
        personnel::PersonnelService,
        reporting::ReportingService,
        reports::DailyReportService,
        sites::SiteService,
        users::UserService,
        vehicles::VehicleService,
        warehouse::{CategoryService, ItemService, LedgerService, RequestService},
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub sites: Arc<SiteService>,
    pub machines: Arc<MachineService>,
    pub reports: Arc<DailyReportService>,
    pub fiches: Arc<FicheService>,
    pub personnel: Arc<PersonnelService>,
    pub attendance: Arc<AttendanceService>,
    pub vehicles: Arc<VehicleService>,
    pub categories: Arc<CategoryService>,
    pub items: Arc<ItemService>,
    pub ledger: Arc<LedgerService>,
    pub requests: Arc<RequestService>,
    pub notifications: Arc<NotificationService>,
    pub audit: Arc<AuditService>,
    pub dashboard: Arc<DashboardService>,
    pub reporting: Arc<ReportingService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let machines = Arc::new(MachineService::new(db_pool.clone()));
        let ledger = Arc::new(LedgerService::new(db_pool.clone()));
        let requests = Arc::new(RequestService::new(db_pool.clone()));
        let notifications = Arc::new(NotificationService::new(
            db_pool.clone(),
            config.notification_retention_days,
        ));
        let dashboard = Arc::new(DashboardService::new(
            db_pool.clone(),
            machines.clone(),
            ledger.clone(),
            requests.clone(),
            notifications.clone(),
        ));

        Self {
            users: Arc::new(UserService::new(db_pool.clone())),
            sites: Arc::new(SiteService::new(db_pool.clone())),
            machines,
            reports: Arc::new(DailyReportService::new(db_pool.clone())),
            fiches: Arc::new(FicheService::new(db_pool.clone())),
            personnel: Arc::new(PersonnelService::new(db_pool.clone())),
            attendance: Arc::new(AttendanceService::new(db_pool.clone())),
            vehicles: Arc::new(VehicleService::new(db_pool.clone())),
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            items: Arc::new(ItemService::new(db_pool.clone())),
            ledger,
            requests,
            notifications,
            audit: Arc::new(AuditService::new(db_pool.clone())),
            dashboard,
            reporting: Arc::new(ReportingService::new(db_pool)),
        }
    }
}
