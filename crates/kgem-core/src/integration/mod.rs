//! Integration layer - seams for external collaborators.

pub mod client;
pub mod lock;

pub use client::{BoxedClient, Client};
pub use lock::{NamedLock, NamedLockGuard};
