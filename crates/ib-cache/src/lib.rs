pub mod cache;
pub mod intent;

pub use cache::CommandCache;
pub use intent::{classify, extract_params, Params, GENERIC};
