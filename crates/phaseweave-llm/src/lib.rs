mod client;
mod types;

pub mod conversation;
pub mod drafter;

pub use client::*;
pub use types::*;
