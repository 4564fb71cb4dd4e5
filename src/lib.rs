pub mod db;
pub mod db_backup;
pub mod error;
pub mod reports;
pub mod schema;
pub mod services;
pub mod state;
pub mod types;
