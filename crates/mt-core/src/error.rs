use thiserror::Error;

#[derive(Error, Debug)]
pub enum MtError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
