//! # Brivas GSM Bridge
//!
//! Call-control and voice bridge between a call-routing engine and a GSM
//! network stack speaking MNCC:
//!
//! - **MNCC** - message model, wire codec, outbound queue, connection manager
//! - **Calls** - per-call state machine, registry and deferred reaping
//! - **Voice** - traffic channel relay over Unix datagram sockets
//! - **Audio** - GSM 06.10 full-rate codec and G.711 line encoding
//!
//! ## Example
//! ```rust,ignore
//! use brivas_gsm_bridge::{BridgeConfig, MnccLink};
//!
//! let config = BridgeConfig::from_file("gsm-bridge.toml")?;
//! let (engine_tx, engine_rx) = tokio::sync::mpsc::unbounded_channel();
//! let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel();
//! let link = MnccLink::new(config.links[0].clone(), engine_tx, command_rx);
//! link.run(shutdown_rx).await?;
//! ```

pub mod audio;
pub mod bridge;
pub mod call;
pub mod config;
pub mod engine;
pub mod errors;
pub mod mncc;
pub mod screen;
pub mod telemetry;
pub mod types;
pub mod voice;

// Re-exports
pub use bridge::Bridge;
pub use call::{Call, CallState};
pub use config::{BridgeConfig, LinkConfig, PortSettings};
pub use engine::{EndpointRequest, EngineCommand, EngineEvent, EngineMessage};
pub use errors::{BridgeError, Result};
pub use mncc::MnccLink;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
