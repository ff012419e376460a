// core.rs splits chain responsibilities into submodules.
pub mod chain;
pub mod engine;
pub mod state;
pub mod validation;

pub use chain::*;
pub use engine::*;
pub use state::*;
pub use validation::*;
