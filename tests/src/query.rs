use super::*;

use rand::{rngs::StdRng, SeedableRng};
use tempfile::TempDir;

use common::Numeric;
use exec::{HashTable, ValidHashTableIndexes};

#[test]
fn filters_on_shipdate_and_groups() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  let mut page = LineitemPageQ1::zeroed();
  push_tuple(&mut page, "1998-09-01", b'A', b'F', "17.00", "1000.00", "0.05", "0.02");
  push_tuple(&mut page, "1998-09-02", b'N', b'O', "5.00", "200.00", "0.10", "0.04");
  push_tuple(&mut page, "1998-09-03", b'N', b'O', "30.00", "500.00", "0.00", "0.08");
  write_pages(&path, &[page]);

  let result = run_query(&path, 1, 0, 1000, false, 0);
  assert_eq!(result.len(), 2);

  let af = &result[0];
  assert_eq!((af.l_returnflag, af.l_linestatus), (Char(b'A'), Char(b'F')));
  assert_eq!(af.count, 1);
  assert_eq!(af.sum_qty, Numeric(1700));
  assert_eq!(af.sum_base_price, Numeric(100_000));
  assert_eq!(af.sum_disc, Numeric(5));
  assert_eq!(af.sum_disc_price, Numeric(9_500_000));
  assert_eq!(af.sum_charge, Numeric(9_690_000));

  let no = &result[1];
  assert_eq!((no.l_returnflag, no.l_linestatus), (Char(b'N'), Char(b'O')));
  assert_eq!(no.count, 1);
  assert_eq!(no.sum_qty, Numeric(500));
  assert_eq!(no.sum_base_price, Numeric(20_000));
  assert_eq!(no.sum_disc, Numeric(10));
  assert_eq!(no.sum_disc_price, Numeric(1_800_000));
  assert_eq!(no.sum_charge, Numeric(1_872_000));
}

#[test]
fn empty_pages_and_filtered_pages_contribute_nothing() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  let empty = LineitemPageQ1::zeroed();
  let mut late = LineitemPageQ1::zeroed();
  push_tuple(&mut late, "1998-09-03", b'R', b'F', "1.00", "10.00", "0.00", "0.00");
  push_tuple(&mut late, "1999-01-01", b'R', b'F', "1.00", "10.00", "0.00", "0.00");
  let mut ok = LineitemPageQ1::zeroed();
  push_tuple(&mut ok, "1995-06-15", b'A', b'F', "2.00", "20.00", "0.00", "0.00");
  write_pages(&path, &[empty, late.clone(), ok]);

  let result = run_query(&path, 2, 0, 1000, false, 0);
  assert_eq!(result.len(), 1);
  assert_eq!(result[0].count, 1);
  assert_eq!(result[0].sum_qty, Numeric(200));

  // all tuples filtered => no groups at all
  let filtered_only = dir.path().join("late.dat");
  write_pages(&filtered_only, &[late]);
  assert!(run_query(&filtered_only, 1, 0, 1000, false, 0).is_empty());
}

#[test]
fn sync_and_async_modes_agree() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  let mut rng = StdRng::seed_from_u64(42);
  write_pages(&path, &random_pages(&mut rng, 16));

  let sync = run_query(&path, 2, 0, 1000, false, 0);
  assert!(!sync.is_empty());
  assert_eq!(run_query(&path, 2, 8, 1000, false, 0), sync);
}

#[test]
fn parallel_random_io_matches_single_thread_reference() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  let mut rng = StdRng::seed_from_u64(42);
  write_pages(&path, &random_pages(&mut rng, 256));

  let reference = run_query(&path, 1, 0, 1000, false, 0);
  assert_eq!(run_query(&path, 8, 32, 1000, true, 0), reference);
}

#[test]
fn result_is_independent_of_the_cached_fraction() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  let mut rng = StdRng::seed_from_u64(42);
  write_pages(&path, &random_pages(&mut rng, 20));

  let reference = run_query(&path, 1, 0, 1000, false, 0);
  for tenths in 1..=10 {
    assert_eq!(run_query(&path, 2, 0, 1000, true, tenths), reference, "sync, {}/10 cached", tenths);
    assert_eq!(run_query(&path, 2, 4, 1000, true, tenths), reference, "async, {}/10 cached", tenths);
  }
}

#[test]
fn populate_resolves_swips_to_byte_equal_frames() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lineitem.dat");
  let mut rng = StdRng::seed_from_u64(42);
  write_pages(&path, &random_pages(&mut rng, 7));

  let data_file = File::open(&path, false).unwrap();
  let mut swips = driver::get_swips(data_file.read_size().unwrap());
  assert_eq!(swips.len(), 7);
  // swip totality: logical identities are exactly 0..num_pages
  let mut identities: Vec<u64> = swips.iter().map(|s| s.page_index()).collect();
  identities.sort_unstable();
  assert_eq!(identities, (0..7).collect::<Vec<u64>>());

  let mut cache = Cache::new(swips.len());
  cache.populate(&mut swips, &data_file, &[1, 4, 6]);

  let mut expected = LineitemPageQ1::zeroed();
  for (position, swip) in swips.iter().enumerate() {
    if [1, 4, 6].contains(&position) {
      assert!(!swip.is_page_index());
      data_file.read_page(position as u64, &mut expected);
      let frame: &LineitemPageQ1 = unsafe { swip.pointer() };
      assert_eq!(frame.as_bytes(), expected.as_bytes());
    } else {
      assert_eq!(swip.page_index(), position as u64);
    }
  }
}

#[test]
fn valid_indexes_witness_the_occupied_slots() {
  let mut page = LineitemPageQ1::zeroed();
  push_tuple(&mut page, "1995-01-01", b'A', b'F', "1.00", "10.00", "0.00", "0.00");
  push_tuple(&mut page, "1995-01-02", b'N', b'O', "1.00", "10.00", "0.00", "0.00");
  push_tuple(&mut page, "1995-01-03", b'A', b'F', "1.00", "10.00", "0.00", "0.00");
  push_tuple(&mut page, "1995-01-04", b'R', b'F', "1.00", "10.00", "0.00", "0.00");

  let mut table = HashTable::new();
  table.resize_with(1 << 16, || None);
  let mut valid = ValidHashTableIndexes::new();
  let high_date = Date::parse("1998-09-02|", '|').unwrap();
  QueryRunner::process_tuples(&page, &mut table, &mut valid, high_date);
  QueryRunner::process_tuples(&page, &mut table, &mut valid, high_date);

  let mut occupied: Vec<u32> = table.iter().enumerate()
    .filter_map(|(i, slot)| slot.as_ref().map(|_| i as u32))
    .collect();
  let mut witnessed = valid.clone();
  witnessed.sort_unstable();
  occupied.sort_unstable();
  assert_eq!(witnessed, occupied);
  assert_eq!(valid.len(), 3); // no duplicates across repeated pages
}
