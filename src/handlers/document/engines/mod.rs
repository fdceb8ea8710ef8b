//! Document store engines

pub mod memory;
#[cfg(feature = "mongodb-backend")]
pub mod mongodb;

pub use memory::MemoryConnector;
#[cfg(feature = "mongodb-backend")]
pub use self::mongodb::{MongoConnectionOptions, MongoConnector};
