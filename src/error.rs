use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not refresh the flag cache")]
    Cache,
    #[display("background refresh task failed")]
    Task,
    /// Reading or writing `_0` failed.
    #[display("I/O error on {_0}")]
    Io(#[error(not(source))] String),
}
