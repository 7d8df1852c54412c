pub mod env;
pub mod io;
pub mod redact;
pub mod schema;

pub use io::load_config;
pub use redact::Secret;
pub use schema::RoomLockConfig;
