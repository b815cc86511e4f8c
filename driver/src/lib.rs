pub mod load;

use std::{cmp::min, io::Write, time::Instant};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;

use common::{Error, Result, PAGE_SIZE, PAGE_SIZE_POWER};
use exec::{Cache, HashTableEntry, QueryRunner};
use storage::{File, Swip};

pub const USAGE: &str =
  "lineitem.dat num_threads num_entries_per_ring num_tuples_per_morsel do_work do_random_io print_result print_header";

pub struct Args {
  pub path_to_lineitem: String,
  pub num_threads: u32,
  pub num_entries_per_ring: u32,
  pub num_tuples_per_morsel: u64,
  pub do_work: bool,
  pub do_random_io: bool,
  pub print_result: bool,
  pub print_header: bool,
  // not on the command line; tests run on filesystems without O_DIRECT
  pub direct_io: bool,
}

impl Args {
  // the eight positional args after the program name
  pub fn parse(args: &[String]) -> Result<Args> {
    fn int<T: std::str::FromStr>(s: &str) -> Result<T> {
      s.parse().map_err(|_| Error::InvalidInt(s.into()))
    }
    fn boolean(s: &str) -> Result<bool> {
      s.parse().map_err(|_| Error::InvalidBool(s.into()))
    }
    debug_assert_eq!(args.len(), 8);
    Ok(Args {
      path_to_lineitem: args[0].clone(),
      num_threads: int(&args[1])?,
      num_entries_per_ring: int(&args[2])?,
      num_tuples_per_morsel: int(&args[3])?,
      do_work: boolean(&args[4])?,
      do_random_io: boolean(&args[5])?,
      print_result: boolean(&args[6])?,
      print_header: boolean(&args[7])?,
      direct_io: true,
    })
  }
}

const CSV_HEADER: [&str; 12] = [
  "kind_of_io", "page_size_power", "num_threads", "num_cached_pages", "num_total_pages",
  "num_entries_per_ring", "num_tuples_per_morsel", "do_work", "do_random_io", "time_ms",
  "file_size", "throughput_gb_s",
];

#[derive(Serialize)]
struct BenchRecord<'a> {
  kind_of_io: &'a str,
  page_size_power: u32,
  num_threads: u32,
  num_cached_pages: u64,
  num_total_pages: u64,
  num_entries_per_ring: u32,
  num_tuples_per_morsel: u64,
  do_work: bool,
  do_random_io: bool,
  time_ms: u64,
  file_size: u64,
  throughput_gb_s: f64,
}

// one swip per page, logical identity == page index
pub fn get_swips(file_size: u64) -> Vec<Swip> {
  (0..file_size / PAGE_SIZE as u64).map(Swip::make_page_index).collect()
}

pub fn print_result(entries: &[HashTableEntry]) {
  eprintln!("l_returnflag|l_linestatus|sum_qty|sum_base_price|sum_disc_price|sum_charge|avg_qty|avg_price|avg_disc|count_order");
  for e in entries {
    eprintln!("{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
              e.l_returnflag, e.l_linestatus, e.sum_qty, e.sum_base_price, e.sum_disc_price,
              e.sum_charge, e.sum_qty / e.count, e.sum_base_price / e.count,
              e.sum_disc / e.count, e.count);
  }
}

// sweeps the cached fraction from 0% to 100% in tenths, running the
// synchronous and the asynchronous query on every step
pub fn run_benchmark(args: &Args, out: impl Write) -> Result<()> {
  let data_file = File::open(&args.path_to_lineitem, args.direct_io)?;
  let file_size = data_file.read_size()?;
  let mut swips = get_swips(file_size);

  let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(out);
  if args.print_header { wtr.write_record(CSV_HEADER)?; }
  if swips.is_empty() { return Ok(wtr.flush()?); }

  let mut rng = StdRng::seed_from_u64(42);
  if args.do_random_io { swips.shuffle(&mut rng); }
  let mut swip_indexes: Vec<u64> = (0..swips.len() as u64).collect();
  swip_indexes.shuffle(&mut rng);

  let mut cache = Cache::new(swips.len());
  let partition_size = (swips.len() + 9) / 10;

  for i in 0..11usize {
    if i > 0 {
      let offset = min((i - 1) * partition_size, swip_indexes.len());
      let len = min(partition_size, swip_indexes.len() - offset);
      cache.populate(&mut swips, &data_file, &swip_indexes[offset..offset + len]);
    }
    let num_cached_pages = min(i * partition_size, swip_indexes.len()) as u64;

    for (kind_of_io, num_entries_per_ring) in
      [("synchronous", 0), ("asynchronous", args.num_entries_per_ring)]
    {
      let mut runner = QueryRunner::new(args.num_threads, &swips, &data_file,
                                        num_entries_per_ring, args.num_tuples_per_morsel,
                                        args.do_work);
      let start = Instant::now();
      runner.start_processing();
      let result = runner.do_post_processing();
      let time_ms = start.elapsed().as_millis() as u64;
      if args.print_result && args.do_work { print_result(&result); }
      wtr.serialize(BenchRecord {
        kind_of_io,
        page_size_power: PAGE_SIZE_POWER,
        num_threads: args.num_threads,
        num_cached_pages,
        num_total_pages: swips.len() as u64,
        num_entries_per_ring,
        num_tuples_per_morsel: args.num_tuples_per_morsel,
        do_work: args.do_work,
        do_random_io: args.do_random_io,
        time_ms,
        file_size,
        throughput_gb_s: (file_size as f64 / 1_000_000_000.0) / (time_ms as f64 / 1000.0),
      })?;
    }
  }
  Ok(wtr.flush()?)
}
