use std::{cell::{Cell, RefCell}, future::Future, os::fd::RawFd, pin::Pin, task::{Context, Poll}};

use io_uring::{opcode, types};

use common::PAGE_SIZE;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Slot {
  Empty,
  Submitted,
  Done(i32),
}

struct RingInner {
  ring: io_uring::IoUring,
  slots: Box<[Slot]>,
  free: Vec<u16>,
}

// thread-local submission/completion ring of fixed capacity; every producer
// task keeps at most one read outstanding, so the slot table never overflows
// i/o errors here are not recoverable, the whole benchmark run would be
// meaningless, so they abort the process
pub struct IOUring {
  inner: RefCell<RingInner>,
}

impl IOUring {
  pub fn new(num_ring_entries: u32) -> IOUring {
    let ring = io_uring::IoUring::new(num_ring_entries)
      .unwrap_or_else(|e| panic!("failed to set up an io_uring with {} entries: {}", num_ring_entries, e));
    IOUring {
      inner: RefCell::new(RingInner {
        ring,
        slots: vec![Slot::Empty; num_ring_entries as usize].into_boxed_slice(),
        free: (0..num_ring_entries as u16).rev().collect(),
      }),
    }
  }

  // enqueues a one-page read; the sqe is handed to the kernel by the next
  // `wait_and_complete`, which batches submissions across tasks
  pub(crate) fn submit_read(&self, fd: RawFd, offset: u64, dst: *mut u8) -> u16 {
    let mut g = self.inner.borrow_mut();
    let slot = match g.free.pop() { Some(s) => s, None => panic!("io ring slots exhausted") };
    debug_assert_eq!(g.slots[slot as usize], Slot::Empty);
    g.slots[slot as usize] = Slot::Submitted;
    let sqe = opcode::Read::new(types::Fd(fd), dst, PAGE_SIZE as u32)
      .offset(offset)
      .build()
      .user_data(slot as u64);
    unsafe {
      if g.ring.submission().push(&sqe).is_err() { panic!("io ring submission queue full"); }
    }
    slot
  }

  pub(crate) fn take_completion(&self, slot: u16) -> Option<i32> {
    let mut g = self.inner.borrow_mut();
    match g.slots[slot as usize] {
      Slot::Done(res) => {
        g.slots[slot as usize] = Slot::Empty;
        g.free.push(slot);
        Some(res)
      }
      Slot::Submitted => None,
      Slot::Empty => unreachable!("completion taken twice"),
    }
  }

  pub fn has_in_flight(&self) -> bool {
    let g = self.inner.borrow();
    g.free.len() < g.slots.len()
  }

  // submits queued reads, blocks until at least one completion arrives, and
  // marks every drained completion so its task resumes at the next poll
  pub fn wait_and_complete(&self) {
    let mut g = self.inner.borrow_mut();
    let inner = &mut *g;
    if let Err(e) = inner.ring.submit_and_wait(1) { panic!("io_uring submit failed: {}", e); }
    for cqe in inner.ring.completion() {
      let slot = cqe.user_data() as usize;
      debug_assert_eq!(inner.slots[slot], Slot::Submitted);
      inner.slots[slot] = Slot::Done(cqe.result());
    }
  }
}

// suspends the calling task until the read completes; resumption happens on
// the draining thread, which is always the worker's own
pub struct AsyncReadPage<'a> {
  ring: &'a IOUring,
  fd: RawFd,
  offset: u64,
  dst: *mut u8,
  slot: Option<u16>,
}

impl<'a> AsyncReadPage<'a> {
  pub(crate) fn new(ring: &'a IOUring, fd: RawFd, offset: u64, dst: *mut u8) -> AsyncReadPage<'a> {
    AsyncReadPage { ring, fd, offset, dst, slot: None }
  }
}

impl Future for AsyncReadPage<'_> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, _cx: &mut Context) -> Poll<()> {
    let me = self.get_mut();
    match me.slot {
      None => {
        me.slot = Some(me.ring.submit_read(me.fd, me.offset, me.dst));
        Poll::Pending
      }
      Some(slot) => match me.ring.take_completion(slot) {
        Some(res) => {
          if res != PAGE_SIZE as i32 {
            panic!("page read at offset {} returned {} instead of {} bytes", me.offset, res, PAGE_SIZE);
          }
          Poll::Ready(())
        }
        None => Poll::Pending,
      },
    }
  }
}

// producer-completion counter; only the owning worker thread touches it
pub struct Countdown(Cell<u64>);

impl Countdown {
  pub fn new(n: u64) -> Countdown { Countdown(Cell::new(n)) }

  pub fn decrement(&self) {
    debug_assert!(self.0.get() > 0);
    self.0.set(self.0.get() - 1);
  }

  pub fn is_done(&self) -> bool { self.0.get() == 0 }
}

// yields exactly once, so tasks resumed by `wait_and_complete` get to run
// before the drain blocks again
struct YieldNow(bool);

impl Future for YieldNow {
  type Output = ();

  fn poll(self: Pin<&mut Self>, _cx: &mut Context) -> Poll<()> {
    let me = self.get_mut();
    if me.0 { Poll::Ready(()) } else { (me.0 = true, Poll::Pending).1 }
  }
}

// cooperative drain: keeps blocking on the ring until every producer has
// finished and every submitted read has been observed
pub async fn drain_ring(ring: &IOUring, countdown: &Countdown) {
  while !countdown.is_done() || ring.has_in_flight() {
    ring.wait_and_complete();
    YieldNow(false).await;
  }
}
