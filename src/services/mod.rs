// Accounts and access
pub mod audit;
pub mod users;

// Site operations
pub mod fiches;
pub mod machines;
pub mod reports;
pub mod sites;

// People and fleet
pub mod attendance;
pub mod personnel;
pub mod vehicles;

// Warehouse (magazzino)
pub mod warehouse;

// Cross-cutting
pub mod dashboard;
pub mod notifications;
pub mod reporting;
