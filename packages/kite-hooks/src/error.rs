use crate::hook::CallbackId;
use thiserror::Error;

/// Usage errors raised by a [`Hook`](crate::Hook).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("callback {0:?} is not registered on this hook")]
    CallbackNotFound(CallbackId),

    #[error("hook is not cancellable")]
    NotCancellable,

    #[error("hook fires only once and has already fired")]
    AlreadyFired,
}

pub type Result<T> = std::result::Result<T, HookError>;
