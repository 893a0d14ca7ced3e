//! Warehouse (magazzino): categories, items, the stock ledger and
//! withdrawal requests.

pub mod categories;
pub mod items;
pub mod ledger;
pub mod requests;

pub use categories::CategoryService;
pub use items::ItemService;
pub use ledger::LedgerService;
pub use requests::RequestService;
