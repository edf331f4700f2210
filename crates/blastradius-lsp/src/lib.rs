//! Background LSP runtime, client, and session management (§4.C).
//!
//! Outer synchronous code drives this subsystem through
//! [`runtime::global_runtime`]'s blocking `run(task, timeout)` bridge;
//! [`session_manager::SessionManager`] owns one [`session::Session`] per
//! `(language, workspace_root)` pair.

pub mod client;
pub mod failure;
pub mod normalize;
pub mod protocol;
pub mod runtime;
pub mod server_registry;
pub mod session;
pub mod session_manager;

pub use client::LspClient;
pub use failure::{LspFailure, LspFailureReason};
pub use normalize::{normalize_definition_response, NormalizedLocation};
pub use runtime::{global_runtime, LspRuntime};
pub use session::{BatchDefinitionRequest, Session};
pub use session_manager::SessionManager;
