pub mod audit_log;
pub mod daily_report;
pub mod fiche;
pub mod fiche_layer;
pub mod machine;
pub mod notification;
pub mod personnel;
pub mod personnel_attendance;
pub mod site;
pub mod user;
pub mod vehicle;

// Warehouse
pub mod warehouse_category;
pub mod warehouse_item;
pub mod warehouse_movement;
pub mod warehouse_request;
pub mod warehouse_request_line;

pub use user::Role;
