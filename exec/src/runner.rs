use std::{cell::RefCell, cmp::min, sync::atomic::{AtomicU64, Ordering}, thread};

use common::{Char, Date, Numeric};
use storage::{drain_ring, Countdown, File, IOUring, LineitemPageQ1, PageFrames, Swip, MAX_NUM_TUPLES};
use crate::{alloc::install_frame_allocator, task::{run_all, Task}};

// group key is (l_returnflag << 8) | l_linestatus, so the table is a plain
// direct-addressed array: O(1) probe, trivial per-thread zeroing
const HASH_TABLE_SIZE: usize = 1 << 16;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HashTableEntry {
  pub sum_qty: Numeric<12, 2>,
  pub sum_base_price: Numeric<12, 2>,
  pub sum_disc: Numeric<12, 2>,
  pub sum_disc_price: Numeric<12, 4>,
  pub sum_charge: Numeric<12, 4>,
  pub count: u32,
  pub l_returnflag: Char,
  pub l_linestatus: Char,
}

pub type HashTable = Vec<Option<Box<HashTableEntry>>>;
// populated slot indexes in insertion order, so iterating occupied slots is
// O(occupied) instead of O(table size)
pub type ValidHashTableIndexes = Vec<u32>;

// implementation idea for query 1 stolen from the MonetDB/X100 paper
pub struct QueryRunner<'a> {
  thread_local_hash_tables: Vec<HashTable>,
  thread_local_valid_indexes: Vec<ValidHashTableIndexes>,
  high_date: Date,
  swips: &'a [Swip],
  data_file: &'a File,
  num_ring_entries: u32,
  num_tuples_per_morsel: u64,
  do_work: bool,
}

impl<'a> QueryRunner<'a> {
  pub fn new(num_threads: u32, swips: &'a [Swip], data_file: &'a File, num_ring_entries: u32,
             num_tuples_per_morsel: u64, do_work: bool) -> QueryRunner<'a> {
    let mut thread_local_hash_tables = Vec::with_capacity(num_threads as usize);
    thread_local_hash_tables.resize_with(num_threads as usize, || {
      let mut table = HashTable::new();
      table.resize_with(HASH_TABLE_SIZE, || None);
      table
    });
    QueryRunner {
      thread_local_hash_tables,
      thread_local_valid_indexes: vec![Vec::new(); num_threads as usize],
      high_date: match Date::parse("1998-09-02|", '|') { Ok(d) => d, Err(_) => unreachable!() },
      swips,
      data_file,
      num_ring_entries,
      num_tuples_per_morsel,
      do_work,
    }
  }

  pub fn is_synchronous(&self) -> bool { self.num_ring_entries == 0 }

  pub fn process_tuples(page: &LineitemPageQ1, hash_table: &mut HashTable,
                        valid_indexes: &mut ValidHashTableIndexes, high_date: Date) {
    let one = Numeric::<12, 2>(100); // raw mantissa, i.e. 1.00
    for i in 0..page.num_tuples as usize {
      if page.l_shipdate[i] <= high_date {
        let index = ((page.l_returnflag[i].0 as usize) << 8) | page.l_linestatus[i].0 as usize;
        let slot = unsafe { hash_table.get_unchecked_mut(index) };
        if slot.is_none() {
          valid_indexes.push(index as u32);
          *slot = Some(Box::new(HashTableEntry {
            sum_qty: Numeric(0),
            sum_base_price: Numeric(0),
            sum_disc: Numeric(0),
            sum_disc_price: Numeric(0),
            sum_charge: Numeric(0),
            count: 0,
            l_returnflag: page.l_returnflag[i],
            l_linestatus: page.l_linestatus[i],
          }));
        }
        let entry = unsafe { slot.as_mut().unwrap_unchecked() };
        entry.count += 1;
        entry.sum_qty += page.l_quantity[i];
        entry.sum_base_price += page.l_extendedprice[i];
        entry.sum_disc += page.l_discount[i];
        let common_term = page.l_extendedprice[i] * (one - page.l_discount[i]);
        entry.sum_disc_price += common_term;
        entry.sum_charge += common_term.cast_m2() * (one + page.l_tax[i]);
      }
    }
  }

  pub fn process_pages(scratch: &mut LineitemPageQ1, swips: &[Swip], hash_table: &mut HashTable,
                       valid_indexes: &mut ValidHashTableIndexes, high_date: Date, data_file: &File,
                       do_work: bool) {
    for &swip in swips {
      let data: &LineitemPageQ1 = if swip.is_page_index() {
        data_file.read_page(swip.page_index(), scratch);
        scratch
      } else {
        unsafe { swip.pointer() }
      };
      if do_work { Self::process_tuples(data, hash_table, valid_indexes, high_date); }
    }
  }

  // must-read swips are handled first so all suspensions cluster early and
  // the cached tail runs purely on the cpu; each task owns `scratch`, so
  // concurrent in-flight reads never collide
  #[allow(clippy::too_many_arguments)]
  async fn async_process_pages(scratch: *mut LineitemPageQ1, swips: &[Swip],
                               agg: &RefCell<(&mut HashTable, &mut ValidHashTableIndexes)>,
                               high_date: Date, data_file: &File, ring: &IOUring,
                               countdown: &Countdown, do_work: bool) {
    for &swip in swips.iter().filter(|s| s.is_page_index()) {
      data_file.async_read_page(ring, swip.page_index(), scratch).await;
      if do_work {
        let mut agg = agg.borrow_mut();
        let (hash_table, valid_indexes) = &mut *agg;
        Self::process_tuples(unsafe { &*scratch }, hash_table, valid_indexes, high_date);
      }
    }
    if do_work {
      for &swip in swips.iter().filter(|s| !s.is_page_index()) {
        let mut agg = agg.borrow_mut();
        let (hash_table, valid_indexes) = &mut *agg;
        Self::process_tuples(unsafe { swip.pointer() }, hash_table, valid_indexes, high_date);
      }
    }
    countdown.decrement();
  }

  pub fn start_processing(&mut self) {
    let current_swip = AtomicU64::new(0);
    let current_swip = &current_swip;
    let num_swips = self.swips.len() as u64;
    // each morsel covers circa num_tuples_per_morsel tuples
    let sync_fetch_increment =
      ((self.num_tuples_per_morsel + MAX_NUM_TUPLES as u64 - 1) / MAX_NUM_TUPLES as u64).max(1);
    let fetch_increment = if self.is_synchronous() {
      sync_fetch_increment
    } else {
      // async workers claim num_ring_entries morsels per fetch_add and spread
      // them over num_ring_entries concurrent tasks
      sync_fetch_increment * self.num_ring_entries as u64
    };
    let (swips, data_file, high_date, do_work, num_ring_entries) =
      (self.swips, self.data_file, self.high_date, self.do_work, self.num_ring_entries);

    thread::scope(|s| {
      for (hash_table, valid_indexes) in
        self.thread_local_hash_tables.iter_mut().zip(self.thread_local_valid_indexes.iter_mut())
      {
        s.spawn(move || {
          if num_ring_entries == 0 {
            Self::sync_worker(current_swip, fetch_increment, num_swips, swips, data_file,
                              hash_table, valid_indexes, high_date, do_work);
          } else {
            Self::async_worker(current_swip, fetch_increment, num_swips, swips, data_file,
                               hash_table, valid_indexes, high_date, do_work, num_ring_entries);
          }
        });
      }
    });
  }

  #[allow(clippy::too_many_arguments)]
  fn sync_worker(current_swip: &AtomicU64, fetch_increment: u64, num_swips: u64, swips: &[Swip],
                 data_file: &File, hash_table: &mut HashTable,
                 valid_indexes: &mut ValidHashTableIndexes, high_date: Date, do_work: bool) {
    let frames = PageFrames::alloc(1);
    let scratch = unsafe { &mut *frames.get(0) };
    loop {
      let begin = current_swip.fetch_add(fetch_increment, Ordering::Relaxed);
      if begin >= num_swips { return; }
      let end = min(num_swips, begin + fetch_increment);
      Self::process_pages(scratch, &swips[begin as usize..end as usize], hash_table,
                          valid_indexes, high_date, data_file, do_work);
    }
  }

  #[allow(clippy::too_many_arguments)]
  fn async_worker(current_swip: &AtomicU64, fetch_increment: u64, num_swips: u64, swips: &[Swip],
                  data_file: &File, hash_table: &mut HashTable,
                  valid_indexes: &mut ValidHashTableIndexes, high_date: Date, do_work: bool,
                  num_ring_entries: u32) {
    // the producers share one frame size, the drain task another
    let _allocator = install_frame_allocator(num_ring_entries as usize + 1);
    let ring = IOUring::new(num_ring_entries);
    let frames = PageFrames::alloc(num_ring_entries as usize);
    let agg = RefCell::new((hash_table, valid_indexes));
    loop {
      let begin = current_swip.fetch_add(fetch_increment, Ordering::Relaxed);
      if begin >= num_swips { return; }
      let end = min(num_swips, begin + fetch_increment);
      let size = end - begin;

      let countdown = Countdown::new(num_ring_entries as u64);
      let num_pages_per_task = (size + num_ring_entries as u64 - 1) / num_ring_entries as u64;
      let mut tasks = Vec::with_capacity(num_ring_entries as usize + 1);
      for i in 0..num_ring_entries as u64 {
        let local_begin = min(begin + i * num_pages_per_task, end);
        let local_end = min(local_begin + num_pages_per_task, end);
        tasks.push(Task::new(Self::async_process_pages(
          frames.get(i as usize), &swips[local_begin as usize..local_end as usize], &agg,
          high_date, data_file, &ring, &countdown, do_work,
        )));
      }
      tasks.push(Task::new(drain_ring(&ring, &countdown)));
      run_all(&mut tasks);
    }
  }

  // single-threaded merge; that is okay, there are only a handful of groups
  pub fn do_post_processing(&mut self) -> Vec<HashTableEntry> {
    if !self.do_work { return Vec::new(); }
    let (result_table, rest_tables) = match self.thread_local_hash_tables.split_first_mut() {
      Some(split) => split,
      None => return Vec::new(),
    };
    let (result_valid, rest_valid) = match self.thread_local_valid_indexes.split_first_mut() {
      Some(split) => split,
      None => return Vec::new(),
    };

    for (table, valid_indexes) in rest_tables.iter_mut().zip(rest_valid.iter()) {
      for &index in valid_indexes {
        let local = unsafe { table.get_unchecked_mut(index as usize).take().unwrap_unchecked() };
        let slot = &mut result_table[index as usize];
        match slot {
          Some(result) => {
            result.sum_qty += local.sum_qty;
            result.sum_base_price += local.sum_base_price;
            result.sum_disc += local.sum_disc;
            result.sum_disc_price += local.sum_disc_price;
            result.sum_charge += local.sum_charge;
            result.count += local.count;
          }
          None => {
            *slot = Some(local);
            result_valid.push(index);
          }
        }
      }
    }

    let mut entries: Vec<HashTableEntry> = result_valid.iter()
      .map(|&i| *unsafe { result_table[i as usize].as_deref().unwrap_unchecked() })
      .collect();
    entries.sort_unstable_by_key(|e| (e.l_returnflag, e.l_linestatus));
    entries
  }
}
