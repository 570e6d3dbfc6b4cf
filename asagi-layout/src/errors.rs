use std::result;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The structured-array container failed to open, read, write or define something.
    #[error("{context}: {message}")]
    Container { context: String, message: String },

    /// The input grid cannot be converted: wrong dimensionality or a gap in the coordinate axes.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A buffer or record layout does not agree with the grid.
    #[error("layout mismatch: {0}")]
    Layout(String),
}

impl Error {
    pub fn container<C, M>(context: C, message: M) -> Self
    where
        C: Into<String>,
        M: ToString,
    {
        Self::Container {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
