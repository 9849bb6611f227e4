mod parser;
mod writer;

pub use parser::*;
pub use writer::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read or write the PLY file
    #[error("Failed to access PLY file")]
    Io(#[from] std::io::Error),

    /// The header is not an ASCII vertex header
    #[error("Invalid PLY header: {0}")]
    InvalidHeader(String),

    /// A vertex line could not be parsed
    #[error("Invalid vertex on line {line}: {reason}")]
    InvalidVertex {
        /// Line number in the file, starting at 1.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// Unsupported PLY property
    #[error("Unsupported PLY property {0}")]
    UnsupportedProperty(String),
}
