use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Page must be a positive integer")]
    InvalidPage,
    #[error("Limit must be between 1 and {max}")]
    InvalidLimit { max: u32 },
}
