mod manager;
mod shutdown;
mod startup;
mod state;
mod types;


pub use manager::{LifecycleManager, LifecycleOptions, DEFAULT_MAX_SHUTDOWN, DEFAULT_MAX_STARTUP};
pub use types::{ExitReason, LifecycleState};
