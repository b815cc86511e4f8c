#[macro_use]
extern crate static_assertions;

pub mod schema;
pub mod swip;
pub mod file;
pub mod ring;

pub use crate::{schema::*, swip::*, file::*, ring::*};
