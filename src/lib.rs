#[macro_use]
extern crate log;

pub mod codec;
pub mod config;
pub mod dump;
pub mod error;
pub mod flash;
pub mod header;
pub mod mbc;
pub mod progress;
pub mod ram;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testutil;
