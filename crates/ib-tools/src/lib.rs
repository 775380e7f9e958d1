pub mod context;
pub mod executor;
pub mod placement;

pub use context::{build_board_context, render_board_state, BoardContext};
pub use executor::{execute, ExecutionOutcome};
