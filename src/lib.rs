//! Headless core of the task-tracking app: session/identity handling and the
//! task store, backed by an external identity provider and data API.

pub mod config;
pub mod error;
pub mod filter;
pub mod local;
pub mod models;
pub mod notify;
pub mod remote;
pub mod session;
pub mod store;

pub use error::AppError;
pub use session::{AuthState, SessionManager};
pub use store::TaskStore;
