//! Service layer
//!
//! Services hold the agent's behaviour after registration: running shell
//! commands, hosting the compute server, and dispatching a registered task
//! to one or the other.
//!
//! The shell and server services are trait-based so the dispatcher can be
//! exercised without spawning real processes.

mod dispatch;
pub mod server;
pub mod shell;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export traits
pub use server::ServerRuntime;
pub use shell::Shell;

// Re-export implementations
pub use dispatch::{Dispatcher, Outcome};
pub use server::ProcessServerRuntime;
pub use shell::SystemShell;
