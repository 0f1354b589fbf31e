use crate::coroutine::CoroutineId;
use crate::wait::WaitKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("coroutine {0} is already running")]
    DuplicateCoroutine(CoroutineId),

    #[error("coroutine {0} is not running on this executor")]
    CoroutineNotFound(CoroutineId),

    #[error("coroutine {id} yielded `{kind}`, which cannot be built without arguments")]
    InvalidYield { id: CoroutineId, kind: WaitKind },

    #[error("coroutine {id} failed: {source}")]
    CoroutineFailed {
        id: CoroutineId,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
