pub mod db;
pub mod models;
pub mod store;

pub use db::CreditDb;
pub use models::*;
pub use store::CreditStore;
