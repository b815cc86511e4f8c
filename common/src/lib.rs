#[macro_use]
extern crate static_assertions;

pub mod ty;
pub mod errors;

pub use crate::{ty::*, errors::*};

pub const PAGE_SIZE_POWER: u32 = 13;
pub const PAGE_SIZE: usize = 1 << PAGE_SIZE_POWER;

pub type PageIndex = u64;
