//! Per-user workspace resolution
//!
//! Maps an authenticated user to the root directory of their source tree.
//! The mapping is explicit state handed to the server at startup.

pub mod resolver;

pub use resolver::{DirWorkspaceResolver, ResolveError, WorkspaceResolver};
