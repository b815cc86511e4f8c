use std::{alloc::{handle_alloc_error, Layout}, cell::RefCell, ptr::NonNull};

// coroutine frames never need more alignment than malloc guarantees
pub const FRAME_ALIGN: usize = 16;

// hands out blocks of one fixed size from bump-allocated slabs of
// `num_blocks` blocks each; returned blocks go to a freelist, slabs are only
// released on drop
// not thread-safe, every worker owns its own pool
#[cfg_attr(feature = "scalable-alloc", allow(dead_code))]
pub struct FixedAllocator {
  allocation_size: usize,
  num_blocks: usize,
  slabs: Vec<NonNull<u8>>,
  free_list: Vec<NonNull<u8>>,
}

#[cfg_attr(feature = "scalable-alloc", allow(dead_code))]
impl FixedAllocator {
  pub fn new(allocation_size: usize, num_blocks: usize) -> FixedAllocator {
    debug_assert!(allocation_size % FRAME_ALIGN == 0 && num_blocks > 0);
    FixedAllocator { allocation_size, num_blocks, slabs: Vec::new(), free_list: Vec::new() }
  }

  pub fn allocate(&mut self) -> NonNull<u8> {
    if let Some(p) = self.free_list.pop() { return p; }
    let layout = self.slab_layout();
    let slab = match NonNull::new(unsafe { std::alloc::alloc(layout) }) {
      Some(p) => p,
      None => handle_alloc_error(layout),
    };
    self.slabs.push(slab);
    self.free_list.reserve(self.num_blocks * self.slabs.len());
    for i in 1..self.num_blocks {
      self.free_list.push(unsafe { NonNull::new_unchecked(slab.as_ptr().add(i * self.allocation_size)) });
    }
    slab
  }

  pub fn deallocate(&mut self, p: NonNull<u8>) { self.free_list.push(p); }

  #[inline(always)]
  pub fn allocation_size(&self) -> usize { self.allocation_size }

  fn slab_layout(&self) -> Layout {
    unsafe { Layout::from_size_align_unchecked(self.allocation_size * self.num_blocks, FRAME_ALIGN) }
  }
}

impl Drop for FixedAllocator {
  fn drop(&mut self) {
    for &slab in &self.slabs {
      unsafe { std::alloc::dealloc(slab.as_ptr(), self.slab_layout()) };
    }
  }
}

// size-bucketed front-end; the coroutine frame size set is tiny (one size per
// task shape), so first-match linear search beats a general allocator here
pub struct Allocator {
  #[cfg_attr(feature = "scalable-alloc", allow(dead_code))]
  fixed: Vec<FixedAllocator>,
  #[cfg_attr(feature = "scalable-alloc", allow(dead_code))]
  num_blocks: usize,
}

impl Allocator {
  pub fn new(num_blocks: usize) -> Allocator { Allocator { fixed: Vec::new(), num_blocks } }

  #[cfg(not(feature = "scalable-alloc"))]
  pub fn allocate(&mut self, size: usize) -> NonNull<u8> {
    for a in &mut self.fixed {
      if a.allocation_size() == size { return a.allocate(); }
    }
    let num_blocks = self.num_blocks;
    self.fixed.push(FixedAllocator::new(size, num_blocks));
    let a = unsafe { self.fixed.last_mut().unwrap_unchecked() };
    a.allocate()
  }

  #[cfg(not(feature = "scalable-alloc"))]
  pub fn deallocate(&mut self, p: NonNull<u8>, size: usize) {
    for a in &mut self.fixed {
      if a.allocation_size() == size { return a.deallocate(p); }
    }
    // tolerated no-op, a frame must never outlive the bucket it came from
    debug_assert!(false, "deallocate({}) without a matching bucket", size);
  }

  #[cfg(feature = "scalable-alloc")]
  pub fn allocate(&mut self, size: usize) -> NonNull<u8> {
    global_allocate(size)
  }

  #[cfg(feature = "scalable-alloc")]
  pub fn deallocate(&mut self, p: NonNull<u8>, size: usize) {
    global_deallocate(p, size);
  }
}

thread_local! {
  // per-worker frame allocator, swapped in for the lifetime of an async worker
  static FRAME_ALLOCATOR: RefCell<Option<Allocator>> = RefCell::new(None);
}

// stack-scoped override; dropping the guard tears the allocator down even on
// an early worker exit
pub struct FrameAllocatorScope(());

pub fn install_frame_allocator(num_blocks: usize) -> FrameAllocatorScope {
  FRAME_ALLOCATOR.with(|a| {
    let mut a = a.borrow_mut();
    debug_assert!(a.is_none());
    *a = Some(Allocator::new(num_blocks));
  });
  FrameAllocatorScope(())
}

impl Drop for FrameAllocatorScope {
  fn drop(&mut self) {
    FRAME_ALLOCATOR.with(|a| *a.borrow_mut() = None);
  }
}

// frames built outside a worker (e.g. cache population on the main thread)
// fall back to the global allocator
pub(crate) fn allocate_frame(size: usize) -> NonNull<u8> {
  FRAME_ALLOCATOR.with(|a| match &mut *a.borrow_mut() {
    Some(a) => a.allocate(size),
    None => global_allocate(size),
  })
}

pub(crate) fn deallocate_frame(p: NonNull<u8>, size: usize) {
  FRAME_ALLOCATOR.with(|a| match &mut *a.borrow_mut() {
    Some(a) => a.deallocate(p, size),
    None => global_deallocate(p, size),
  })
}

fn global_allocate(size: usize) -> NonNull<u8> {
  let layout = unsafe { Layout::from_size_align_unchecked(size, FRAME_ALIGN) };
  match NonNull::new(unsafe { std::alloc::alloc(layout) }) {
    Some(p) => p,
    None => handle_alloc_error(layout),
  }
}

fn global_deallocate(p: NonNull<u8>, size: usize) {
  let layout = unsafe { Layout::from_size_align_unchecked(size, FRAME_ALIGN) };
  unsafe { std::alloc::dealloc(p.as_ptr(), layout) };
}
