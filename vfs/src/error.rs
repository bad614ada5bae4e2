use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A path component, directory entry or inode does not resolve.
    #[error("no such file or directory")]
    NotFound,

    /// No free block or inode slot is left.
    #[error("no space left on volume")]
    Exhausted,

    #[error("permission denied")]
    PermissionDenied,

    /// The path cannot be split into a parent and a child.
    #[error("invalid path")]
    InvalidPath,

    #[error("entry already exists")]
    AlreadyExists,

    #[error("not a directory")]
    NotADirectory,

    /// File content operations on a directory.
    #[error("is a directory")]
    IsADirectory,

    #[error("directory not empty")]
    DirectoryNotEmpty,

    #[error("file name too long")]
    NameTooLong,

    /// The backing region cannot hold a volume of the requested shape.
    #[error("invalid volume geometry: {0}")]
    InvalidGeometry(String),

    /// An on-disk invariant is broken. This never stems from bad input,
    /// only from earlier corruption, and aborts the current operation.
    #[error("consistency fault: {0}")]
    ConsistencyFault(String),
}

impl Error {
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConsistencyFault(_))
    }
}
