#[derive(Debug)]
pub enum Error {
  InvalidNumeric(Box<str>),
  InvalidDate { date: Box<str>, reason: chrono::ParseError },
  InvalidInt(Box<str>),
  InvalidBool(Box<str>),
  InvalidChar(Box<str>),
  TblLenMismatch { expect: usize, actual: usize },
  CSV(csv::Error),
  IO(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
  fn from(e: std::io::Error) -> Self { Error::IO(e) }
}

impl From<csv::Error> for Error {
  fn from(e: csv::Error) -> Self { Error::CSV(e) }
}
