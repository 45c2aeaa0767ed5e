pub mod error;
pub mod migrations;
pub mod repository;
pub mod store;

pub use error::StoreError;
pub use store::Store;
