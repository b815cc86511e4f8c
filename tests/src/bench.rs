use super::*;

use std::path::PathBuf;

use rand::{rngs::StdRng, SeedableRng};
use tempfile::TempDir;

use driver::{run_benchmark, Args};

fn args(path: PathBuf, do_work: bool, print_header: bool) -> Args {
  Args {
    path_to_lineitem: path.into_os_string().into_string().unwrap(),
    num_threads: 2,
    num_entries_per_ring: 4,
    num_tuples_per_morsel: 1000,
    do_work,
    do_random_io: false,
    print_result: false,
    print_header,
    direct_io: false,
  }
}

fn run_to_rows(args: &Args) -> Vec<Vec<String>> {
  let mut out = Vec::new();
  run_benchmark(args, &mut out).unwrap();
  String::from_utf8(out).unwrap().lines()
    .map(|line| line.split(',').map(str::to_owned).collect())
    .collect()
}

#[test]
fn emits_a_row_pair_per_cached_fraction() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  let mut rng = StdRng::seed_from_u64(42);
  write_pages(&path, &random_pages(&mut rng, 20));

  let rows = run_to_rows(&args(path, true, true));
  assert_eq!(rows[0][0], "kind_of_io");
  let data = &rows[1..];
  assert_eq!(data.len(), 22);

  for (i, pair) in data.chunks(2).enumerate() {
    let (sync, async_) = (&pair[0], &pair[1]);
    assert_eq!(sync[0], "synchronous");
    assert_eq!(async_[0], "asynchronous");
    assert_eq!(sync[5], "0");
    assert_eq!(async_[5], "4");
    // num_cached_pages climbs by ceil(20 / 10) per step
    assert_eq!(sync[3], (i * 2).to_string());
    // everything except kind_of_io, num_entries_per_ring and the timings is
    // identical between the two modes
    for col in [1, 2, 3, 4, 6, 7, 8, 10] {
      assert_eq!(sync[col], async_[col], "column {} of pair {}", col, i);
    }
    assert_eq!(sync[4], "20");
    assert_eq!(sync[7], "true");
  }
}

#[test]
fn do_work_false_still_produces_csv() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  let mut rng = StdRng::seed_from_u64(42);
  write_pages(&path, &random_pages(&mut rng, 4));

  let rows = run_to_rows(&args(path, false, false));
  assert_eq!(rows.len(), 22);
  assert!(rows.iter().all(|row| row[7] == "false"));
}

#[test]
fn header_only_run_on_an_empty_file() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  std::fs::write(&path, b"").unwrap();

  let rows = run_to_rows(&args(path.clone(), true, true));
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0], vec![
    "kind_of_io", "page_size_power", "num_threads", "num_cached_pages", "num_total_pages",
    "num_entries_per_ring", "num_tuples_per_morsel", "do_work", "do_random_io", "time_ms",
    "file_size", "throughput_gb_s",
  ]);

  // and without the header the run is completely silent
  assert!(run_to_rows(&args(path, true, false)).is_empty());
}

#[test]
fn args_parse_round_trip() {
  let raw: Vec<String> = ["lineitem.dat", "8", "32", "1000", "true", "false", "true", "false"]
    .iter().map(|s| s.to_string()).collect();
  let args = Args::parse(&raw).unwrap();
  assert_eq!(args.num_threads, 8);
  assert_eq!(args.num_entries_per_ring, 32);
  assert_eq!(args.num_tuples_per_morsel, 1000);
  assert!(args.do_work && !args.do_random_io && args.print_result && !args.print_header);
  assert!(args.direct_io);

  let mut bad = raw.clone();
  bad[1] = "eight".to_string();
  assert!(Args::parse(&bad).is_err());
  bad[1] = "8".to_string();
  bad[4] = "yes".to_string();
  assert!(Args::parse(&bad).is_err());
}
