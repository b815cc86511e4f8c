use std::{fs, io::Write, path::Path};

use common::{Char, Date, Error, Result};
use storage::{LineitemPageQ1, MAX_NUM_TUPLES};

// positions of the columns query 1 needs in a pipe-delimited lineitem.tbl row
const QUANTITY: usize = 4;
const EXTENDEDPRICE: usize = 5;
const DISCOUNT: usize = 6;
const TAX: usize = 7;
const RETURNFLAG: usize = 8;
const LINESTATUS: usize = 9;
const SHIPDATE: usize = 10;
const NUM_TBL_COLS: usize = 16;

// converts a tpc-h lineitem dump into the paged columnar file the benchmark
// scans; returns the number of pages written
pub fn load_lineitem(tbl: impl AsRef<Path>, dat: impl AsRef<Path>) -> Result<u64> {
  let mut rdr = csv::ReaderBuilder::new()
    .delimiter(b'|')
    .has_headers(false)
    .flexible(true)
    .from_path(tbl)?;
  let mut out = fs::File::create(dat)?;
  let mut page = LineitemPageQ1::zeroed();
  let mut num_pages = 0u64;

  for record in rdr.records() {
    let record = record?;
    let field = |i: usize| {
      record.get(i).ok_or(Error::TblLenMismatch { expect: NUM_TBL_COLS, actual: record.len() })
    };
    let flag = |i: usize| -> Result<Char> {
      match field(i)?.bytes().next() {
        Some(b) => Ok(Char(b)),
        None => Err(Error::InvalidChar(field(i)?.into())),
      }
    };
    let n = page.num_tuples as usize;
    page.l_quantity[n] = field(QUANTITY)?.parse()?;
    page.l_extendedprice[n] = field(EXTENDEDPRICE)?.parse()?;
    page.l_discount[n] = field(DISCOUNT)?.parse()?;
    page.l_tax[n] = field(TAX)?.parse()?;
    page.l_returnflag[n] = flag(RETURNFLAG)?;
    page.l_linestatus[n] = flag(LINESTATUS)?;
    page.l_shipdate[n] = Date::parse(field(SHIPDATE)?, '|')?;
    page.num_tuples += 1;
    if page.num_tuples as usize == MAX_NUM_TUPLES {
      out.write_all(page.as_bytes())?;
      num_pages += 1;
      page = LineitemPageQ1::zeroed();
    }
  }
  if page.num_tuples > 0 {
    out.write_all(page.as_bytes())?;
    num_pages += 1;
  }
  Ok(num_pages)
}
