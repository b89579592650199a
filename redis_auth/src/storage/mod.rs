mod errors;
mod memory;
mod redis;
mod types;

pub use self::redis::RedisSessionStore;
pub use errors::StorageError;
pub use memory::InMemorySessionStore;
pub use types::SessionStore;
