use std::{fmt, ops::{Add, AddAssign, Div, Mul, Sub}, str::FromStr};
use chrono::NaiveDate;

use crate::{Error, Result};

// fixed-point decimal: i64 mantissa with an implied scale S, the in-memory
// value is mantissa * 10^-S; P is the declared precision, overflow within it
// is not checked
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Numeric<const P: u32, const S: u32>(pub i64);

impl<const P: u32, const S: u32> Numeric<P, S> {
  // rescale to S = 2, truncating towards zero
  #[inline(always)]
  pub fn cast_m2(self) -> Numeric<P, 2> { Numeric(self.0 / 10i64.pow(S - 2)) }
}

impl<const P: u32, const S: u32> Add for Numeric<P, S> {
  type Output = Self;
  #[inline(always)]
  fn add(self, rhs: Self) -> Self { Numeric(self.0 + rhs.0) }
}

impl<const P: u32, const S: u32> AddAssign for Numeric<P, S> {
  #[inline(always)]
  fn add_assign(&mut self, rhs: Self) { self.0 += rhs.0; }
}

impl<const P: u32, const S: u32> Sub for Numeric<P, S> {
  type Output = Self;
  #[inline(always)]
  fn sub(self, rhs: Self) -> Self { Numeric(self.0 - rhs.0) }
}

// multiplying two scale-2 values yields scale 4, the mantissas just multiply
impl<const P: u32> Mul for Numeric<P, 2> {
  type Output = Numeric<P, 4>;
  #[inline(always)]
  fn mul(self, rhs: Self) -> Numeric<P, 4> { Numeric(self.0 * rhs.0) }
}

// averages keep the scale of their sum
impl<const P: u32, const S: u32> Div<u32> for Numeric<P, S> {
  type Output = Self;
  #[inline(always)]
  fn div(self, rhs: u32) -> Self { Numeric(self.0 / rhs as i64) }
}

impl<const P: u32, const S: u32> fmt::Display for Numeric<P, S> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if S == 0 { return write!(f, "{}", self.0); }
    let pow = 10i64.pow(S);
    let (int, frac) = (self.0 / pow, (self.0 % pow).abs());
    if self.0 < 0 && int == 0 {
      write!(f, "-0.{:0width$}", frac, width = S as usize)
    } else {
      write!(f, "{}.{:0width$}", int, frac, width = S as usize)
    }
  }
}

impl<const P: u32, const S: u32> fmt::Debug for Numeric<P, S> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self) }
}

impl<const P: u32, const S: u32> FromStr for Numeric<P, S> {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let (neg, digits) = match s.strip_prefix('-') { Some(r) => (true, r), None => (false, s) };
    let (int, frac) = match digits.split_once('.') { Some((i, f)) => (i, f), None => (digits, "") };
    if int.is_empty() && frac.is_empty() { return Err(Error::InvalidNumeric(s.into())); }
    if frac.len() > S as usize { return Err(Error::InvalidNumeric(s.into())); }
    let mut mantissa = 0i64;
    for b in int.bytes().chain(frac.bytes()) {
      if !b.is_ascii_digit() { return Err(Error::InvalidNumeric(s.into())); }
      mantissa = mantissa * 10 + (b - b'0') as i64;
    }
    mantissa *= 10i64.pow(S - frac.len() as u32);
    Ok(Numeric(if neg { -mantissa } else { mantissa }))
  }
}

// single-byte column value, e.g. l_returnflag
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Char(pub u8);

impl fmt::Display for Char {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0 as char) }
}

impl fmt::Debug for Char {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "'{}'", self.0 as char) }
}

// days since 1970-01-01, total-ordered; tpc-h dates all lie after the epoch
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Date(pub u32);

impl Date {
  // parses `YYYY-MM-DD<term>...`, everything from the terminator on is ignored
  pub fn parse(s: &str, term: char) -> Result<Date> {
    let text = s.split(term).next().unwrap_or(s);
    let d = NaiveDate::parse_from_str(text, "%Y-%m-%d")
      .map_err(|reason| Error::InvalidDate { date: text.into(), reason })?;
    Ok(Date(d.signed_duration_since(NaiveDate::default()).num_days() as u32))
  }
}

impl fmt::Display for Date {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match NaiveDate::default().checked_add_days(chrono::Days::new(self.0 as u64)) {
      Some(d) => write!(f, "{}", d.format("%Y-%m-%d")),
      None => write!(f, "<day {}>", self.0),
    }
  }
}

impl fmt::Debug for Date {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self) }
}

fn _ck() {
  assert_eq_size!(Numeric<12, 2>, i64);
  assert_eq_size!(Date, u32);
  assert_eq_size!(Char, u8);
}
