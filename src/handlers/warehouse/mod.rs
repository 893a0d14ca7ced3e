//! Warehouse (magazzino) endpoints under `/api/v1/warehouse`.

pub mod categories;
pub mod items;
pub mod movements;
pub mod requests;
