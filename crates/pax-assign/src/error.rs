use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("passenger multiplier must be positive")]
    ZeroPassengerMultiplier,

    #[error("linear decision model requires delay_value >= delay_tolerance ({delay_value} < {delay_tolerance})")]
    InvalidDelayValue {
        delay_value: i64,
        delay_tolerance: i64,
    },

    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type AssignResult<T> = Result<T, AssignError>;
