//! Kite Hooks - observer lists used for every lifecycle, input and user
//! extension point in the framework.

pub mod error;
pub mod hook;
pub mod priority;

pub use error::{HookError, Result};
pub use hook::{CallbackId, Canceller, Hook};
pub use priority::Priority;
