//! Runtime initialization and lifecycle management.
//!
//! The runtime is the one place where the store, transport, clock, SWR cache, lookup
//! service and persistence worker are constructed and wired together. Nothing in the crate
//! reaches for process-wide state; every collaborator is handed in here.
//!
//! # Examples
//!
//! ## Server Usage
//!
//! ```no_run
//! use swrpc_core::{config::AppConfig, runtime::SwrRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let runtime = SwrRuntime::builder().with_config(config).build().await?;
//!
//!     let lookup = runtime
//!         .lookup()
//!         .get("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed", "ethereum")
//!         .await?;
//!     println!("{} {}", lookup.status.as_str(), lookup.snapshot.current_price);
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Embedded Usage With Injected Collaborators
//!
//! ```no_run
//! use std::sync::Arc;
//! use swrpc_core::{
//!     config::AppConfig,
//!     runtime::SwrRuntime,
//!     upstream::Endpoint,
//!     utils::clock::ManualClock,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = Arc::new(ManualClock::starting_now());
//! let runtime = SwrRuntime::builder()
//!     .with_config(AppConfig::default())
//!     .with_endpoints(vec![Endpoint::new(
//!         "ethereum",
//!         "http://127.0.0.1:8545",
//!         std::time::Duration::from_millis(1200),
//!     )])
//!     .with_clock(clock)
//!     .with_sinks(Vec::new())
//!     .build()
//!     .await?;
//! # runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod components;
pub mod lifecycle;

pub use builder::{RuntimeError, SwrRuntimeBuilder};
pub use components::SwrComponents;
pub use lifecycle::{HealthReport, SwrRuntime};
