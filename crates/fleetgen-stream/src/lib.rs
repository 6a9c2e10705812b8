#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;
mod server;
mod wire;


pub use crate::client::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::server::*;
pub use crate::wire::*;
