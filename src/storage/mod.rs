// storage/mod.rs
// Database access: pool setup and the resilient wrapper

pub mod database;
pub mod pool;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use database::Database;
pub use pool::init_db_pool_with_path;
