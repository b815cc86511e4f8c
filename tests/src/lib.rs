#![allow(unused)]
mod query;
mod bench;

use std::{fs, path::Path};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use common::{Char, Date, Numeric};
use exec::{Cache, HashTableEntry, QueryRunner};
use storage::{File, LineitemPageQ1, Swip, MAX_NUM_TUPLES};

pub(crate) fn push_tuple(page: &mut LineitemPageQ1, shipdate: &str, flag: u8, status: u8,
                         qty: &str, price: &str, disc: &str, tax: &str) {
  let n = page.num_tuples as usize;
  assert!(n < MAX_NUM_TUPLES);
  page.l_shipdate[n] = Date::parse(shipdate, '|').unwrap();
  page.l_returnflag[n] = Char(flag);
  page.l_linestatus[n] = Char(status);
  page.l_quantity[n] = qty.parse().unwrap();
  page.l_extendedprice[n] = price.parse().unwrap();
  page.l_discount[n] = disc.parse().unwrap();
  page.l_tax[n] = tax.parse().unwrap();
  page.num_tuples += 1;
}

pub(crate) fn write_pages(path: &Path, pages: &[LineitemPageQ1]) {
  let mut bytes = Vec::with_capacity(pages.len() * common::PAGE_SIZE);
  for page in pages {
    bytes.extend_from_slice(page.as_bytes());
  }
  fs::write(path, bytes).unwrap();
}

pub(crate) fn random_pages(rng: &mut StdRng, num_pages: usize) -> Vec<LineitemPageQ1> {
  (0..num_pages).map(|_| {
    let mut page = LineitemPageQ1::zeroed();
    page.num_tuples = rng.gen_range(1..=MAX_NUM_TUPLES) as u32;
    for i in 0..page.num_tuples as usize {
      // shipdates straddle 1998-09-02 (day 10471)
      page.l_shipdate[i] = Date(rng.gen_range(9000..10800));
      page.l_returnflag[i] = Char([b'A', b'N', b'R'][rng.gen_range(0..3)]);
      page.l_linestatus[i] = Char(if rng.gen_bool(0.5) { b'F' } else { b'O' });
      page.l_quantity[i] = Numeric(rng.gen_range(100..5100));
      page.l_extendedprice[i] = Numeric(rng.gen_range(100_000..10_000_000));
      page.l_discount[i] = Numeric(rng.gen_range(0..11));
      page.l_tax[i] = Numeric(rng.gen_range(0..9));
    }
    page
  }).collect()
}

// runs one query over the file with the given configuration and returns the
// sorted groups; `cached_tenths` pre-resolves that many tenths of the pages
pub(crate) fn run_query(path: &Path, num_threads: u32, num_ring_entries: u32,
                        num_tuples_per_morsel: u64, do_random_io: bool,
                        cached_tenths: usize) -> Vec<HashTableEntry> {
  let data_file = File::open(path, false).unwrap();
  let file_size = data_file.read_size().unwrap();
  let mut swips = driver::get_swips(file_size);

  let mut rng = StdRng::seed_from_u64(42);
  if do_random_io { swips.shuffle(&mut rng); }
  let mut swip_indexes: Vec<u64> = (0..swips.len() as u64).collect();
  swip_indexes.shuffle(&mut rng);

  let mut cache = Cache::new(swips.len());
  let partition_size = (swips.len() + 9) / 10;
  let cached = swip_indexes.len().min(cached_tenths * partition_size);
  if cached > 0 {
    cache.populate(&mut swips, &data_file, &swip_indexes[..cached]);
  }

  let mut runner = QueryRunner::new(num_threads, &swips, &data_file, num_ring_entries,
                                    num_tuples_per_morsel, true);
  runner.start_processing();
  runner.do_post_processing()
}
