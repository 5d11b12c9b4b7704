// Envelope module — data model, codec, engine, validation

pub mod codec;
pub mod engine;
pub mod types;
pub mod validate;

pub use codec::{parse, serialize};
pub use engine::{open, rotate, seal};
pub use types::{AssetId, Envelope, RecipientId};
