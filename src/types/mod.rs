mod entity;
mod models;

pub use entity::{EntityKind, FileEntity};
pub use models::*;
