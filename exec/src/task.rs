use std::{future::Future, marker::PhantomData, mem, pin::Pin, ptr::NonNull, task::{Context, Poll, Waker}};

use crate::alloc;

// type-erased cooperative task; the frame holding the future lives in the
// thread-local frame allocator and is pinned there until released
pub struct Task<'a> {
  frame: Option<NonNull<u8>>,
  size: usize,
  poll_fn: unsafe fn(NonNull<u8>, &mut Context) -> Poll<()>,
  drop_fn: unsafe fn(NonNull<u8>),
  _marker: PhantomData<&'a ()>,
}

impl<'a> Task<'a> {
  pub fn new<F: Future<Output = ()> + 'a>(f: F) -> Task<'a> {
    debug_assert!(mem::align_of::<F>() <= alloc::FRAME_ALIGN);
    let size = frame_size::<F>();
    let frame = alloc::allocate_frame(size);
    unsafe { frame.as_ptr().cast::<F>().write(f) };
    Task { frame: Some(frame), size, poll_fn: poll_frame::<F>, drop_fn: drop_frame::<F>, _marker: PhantomData }
  }

  // the frame is freed as soon as the future completes, so the freelist gets
  // reused across morsel claims
  pub fn poll(&mut self, cx: &mut Context) -> Poll<()> {
    let frame = match self.frame { Some(f) => f, None => return Poll::Ready(()) };
    match unsafe { (self.poll_fn)(frame, cx) } {
      Poll::Ready(()) => (self.release(frame), Poll::Ready(())).1,
      Poll::Pending => Poll::Pending,
    }
  }

  fn release(&mut self, frame: NonNull<u8>) {
    unsafe { (self.drop_fn)(frame) };
    alloc::deallocate_frame(frame, self.size);
    self.frame = None;
  }
}

impl Drop for Task<'_> {
  fn drop(&mut self) {
    if let Some(frame) = self.frame { self.release(frame); }
  }
}

// round the frame up so every block handed to the pool stays aligned
fn frame_size<F>() -> usize {
  (mem::size_of::<F>().max(1) + alloc::FRAME_ALIGN - 1) & !(alloc::FRAME_ALIGN - 1)
}

unsafe fn poll_frame<F: Future<Output = ()>>(frame: NonNull<u8>, cx: &mut Context) -> Poll<()> {
  Pin::new_unchecked(&mut *frame.as_ptr().cast::<F>()).poll(cx)
}

unsafe fn drop_frame<F>(frame: NonNull<u8>) {
  std::ptr::drop_in_place(frame.as_ptr().cast::<F>());
}

// drives all tasks to completion on the current thread, round-robin in slice
// order; producers must precede the drain task so every completion the drain
// marked is consumed before the next blocking wait
pub fn run_all(tasks: &mut [Task]) {
  let mut cx = Context::from_waker(Waker::noop());
  loop {
    let mut pending = false;
    for task in tasks.iter_mut() {
      if task.poll(&mut cx).is_pending() { pending = true; }
    }
    if !pending { return; }
  }
}
