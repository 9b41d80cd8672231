pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod websocket;

pub use client::{SessionAgent, SessionAgentConfig};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::{AppError, Result};
pub use models::{DispatchOutcome, Notification};
pub use registry::{ConnectionId, ConnectionRegistry};
pub use websocket::{ClientEvent, ServerEvent};
