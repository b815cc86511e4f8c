use std::fmt;
use common::PageIndex;

// single-word buffer reference: either a page index into the data file or a
// pointer to a resolved in-memory frame
// the page-index form is (index << 1) | 1, so the pointer form (even by
// alignment) loads directly without untagging
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct Swip(u64);

impl Swip {
  #[inline(always)]
  pub fn make_page_index(index: PageIndex) -> Swip {
    debug_assert!(index < 1 << 63);
    Swip((index << 1) | 1)
  }

  #[inline(always)]
  pub fn make_pointer<T>(p: *const T) -> Swip {
    debug_assert_eq!(p as u64 & 1, 0);
    Swip(p as u64)
  }

  #[inline(always)]
  pub fn is_page_index(self) -> bool { self.0 & 1 == 1 }

  #[inline(always)]
  pub fn page_index(self) -> PageIndex {
    debug_assert!(self.is_page_index());
    self.0 >> 1
  }

  // caller must guarantee the swip is in pointer form and the frame outlives 'a
  #[inline(always)]
  pub unsafe fn pointer<'a, T>(self) -> &'a T {
    debug_assert!(!self.is_page_index());
    &*(self.0 as *const T)
  }

  // resolving a swip is its only mutation, there is no demotion
  #[inline(always)]
  pub fn set_pointer<T>(&mut self, p: *const T) { *self = Swip::make_pointer(p); }
}

impl fmt::Debug for Swip {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if self.is_page_index() {
      f.debug_tuple("Swip::PageIndex").field(&self.page_index()).finish()
    } else {
      f.debug_tuple("Swip::Pointer").field(&(self.0 as *const ())).finish()
    }
  }
}

fn _ck() { assert_eq_size!(Swip, u64); }
