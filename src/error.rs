use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed document: {0}")]
    Syntax(nom::Err<nom::error::Error<Box<str>>>),
    #[error("invalid binary property list: {0}")]
    Corrupt(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        Self::Syntax(err.map_input(|input| input.into()))
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        Self::Corrupt(err.to_string())
    }
}
