// Re-export main components
pub mod action;
pub mod error;
pub mod figure;
pub mod math;
pub mod mbac;
pub mod model;
pub mod mtra;
pub mod reader;
pub mod texture;
pub mod transform;

// Re-export common types
pub use action::{Action, ActionTable, MotionChannel};
pub use error::{Mc3Error, Result};
pub use figure::Figure;
pub use mbac::decode_model;
pub use model::Model;
pub use mtra::decode_actions;
pub use texture::Texture;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
