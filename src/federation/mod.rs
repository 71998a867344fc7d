//! Federation collaborators around the compression core.
//!
//! - [`Client`] - local model + local data + its own compressor
//! - [`ServerModel`] - canonical parameters, applies the consensus
//! - [`run_round`] - one broadcast / compress / vote / apply cycle
//!
//! Clients are driven sequentially; placing them on threads or hosts is left
//! to the caller.

pub mod client;
pub mod round;
pub mod server;

pub use client::{Client, ClientUpdate};
pub use round::{run_round, RoundReport};
pub use server::ServerModel;
