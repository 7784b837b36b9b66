use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("label is {0} bytes long, at most 63 allowed")]
    LabelTooLong(usize),

    #[error("resource data is {0} bytes long, at most 65535 allowed")]
    DataTooLong(usize),

    #[error("{0} entries do not fit in a 16-bit section count")]
    TooManyEntries(usize),

    #[error("invalid domain name: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedPacket(msg.into())
    }
}

// Reading past the end of a `Cursor` is how a short packet shows up.
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::malformed("unexpected end of packet"),
            _ => Error::Io(e),
        }
    }
}
