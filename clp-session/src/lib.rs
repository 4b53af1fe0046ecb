//! Per-session pagination cache for CLP search results.
//!
//! A caller stores the full result list of a finished search under its
//! session id, then reads it back one fixed-size page at a time. Sessions
//! idle for longer than the configured TTL are dropped on next access or by
//! the background sweeper.

pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod page;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use manager::SessionManager;
pub use page::Page;
pub use state::{Session, SessionInfo};
