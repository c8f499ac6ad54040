pub mod db;
pub mod sqlite;
pub mod traits;

pub use db::DbConnection;
