use std::{fs, os::fd::AsRawFd, os::unix::fs::{FileExt, OpenOptionsExt}, path::Path};

use common::{PageIndex, Result, PAGE_SIZE};
use crate::{ring::{AsyncReadPage, IOUring}, schema::LineitemPageQ1};

// read-only handle to the paged lineitem file
pub struct File {
  file: fs::File,
}

impl File {
  // `direct` bypasses the page cache; tests run on filesystems without
  // O_DIRECT support and pass false
  pub fn open(path: impl AsRef<Path>, direct: bool) -> Result<File> {
    let mut opts = fs::OpenOptions::new();
    opts.read(true);
    if direct { opts.custom_flags(libc::O_DIRECT); }
    Ok(File { file: opts.open(path)? })
  }

  pub fn read_size(&self) -> Result<u64> { Ok(self.file.metadata()?.len()) }

  // blocking read of one page; an i/o error on the scan path aborts the run
  pub fn read_page(&self, index: PageIndex, dst: &mut LineitemPageQ1) {
    let buf = unsafe { std::slice::from_raw_parts_mut(dst as *mut LineitemPageQ1 as *mut u8, PAGE_SIZE) };
    self.file.read_exact_at(buf, index * PAGE_SIZE as u64)
      .unwrap_or_else(|e| panic!("failed to read page {}: {}", index, e));
  }

  // schedules the read on `ring` and suspends the caller until the completion
  // is observed by the drain
  pub fn async_read_page<'a>(&self, ring: &'a IOUring, index: PageIndex, dst: *mut LineitemPageQ1) -> AsyncReadPage<'a> {
    AsyncReadPage::new(ring, self.file.as_raw_fd(), index * PAGE_SIZE as u64, dst as *mut u8)
  }
}
