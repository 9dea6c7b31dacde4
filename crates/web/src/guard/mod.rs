//! Header guards that run ahead of body processing.
//!
//! Each guard checks one precondition of the request head and either lets the
//! request continue or stops the pipeline.

mod accept;
mod date;
mod expiry;

pub use accept::AcceptGuard;
pub use date::DateGuard;
pub use expiry::ExpiryGuard;
