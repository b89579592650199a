mod codec;
mod manager;
mod types;

pub use codec::to_payload;
pub use manager::SessionManager;
pub use types::Session;

pub(crate) use codec::decode_payload;
