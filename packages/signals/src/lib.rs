#![doc = include_str!("../README.md")]

mod directive;
mod hook;
mod signal;

pub use directive::bind_signal;
pub use hook::use_signal;
pub use signal::{Signal, Subscription};
