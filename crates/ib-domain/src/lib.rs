pub mod board;
pub mod config;
pub mod error;
pub mod recipe;
pub mod stream;
pub mod tool;

pub use board::{BoardObject, ObjectType, Rect};
pub use error::{Error, Result};
pub use recipe::{ActionTemplate, Recipe};
pub use stream::StreamEvent;
pub use tool::{ToolAction, ToolInput, ToolName};
