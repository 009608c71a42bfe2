//! Process-wide initialization.
//!
//! Only logging lives here; the database pool is opened by the setup run itself.

mod logger;

pub use logger::init_logger_with;
