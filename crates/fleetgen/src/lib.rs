#![doc = include_str!("../README.md")]

mod cache;
pub mod factory;
mod generator;
mod record;

pub use crate::cache::*;
pub use crate::generator::*;
pub use crate::record::*;
