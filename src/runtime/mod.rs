//! Managed runtime boundary
//!
//! [`ManagedRuntime`] is everything the bootstrap layer needs from a runtime.
//! [`hosted::HostedRuntime`] implements it for in-process programs.

pub mod heap;
pub mod hosted;
pub mod traits;

pub use heap::{ManagedHeap, ManagedString, ManagedStringList};
pub use hosted::{HostedRuntime, ManagedContext, PendingException};
pub use traits::ManagedRuntime;
