//! Console Router Library
//!
//! Routes the authoring console's data requests. Callers describe what they
//! want with a [`QueryKey`]; the [`RequestRouter`] picks the backend that
//! serves it, shapes the request, and unwraps the response.
//!
//! # Example
//!
//! ```rust,no_run
//! use console_router::{ConsoleConfig, QueryKey, RequestRouter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConsoleConfig::load_from("console.toml")?;
//!     let router = RequestRouter::from_config(&config)?;
//!
//!     // POST slots/slotById {"slot": "greet_slot"}, payload is `response`
//!     let _slot: serde_json::Value = router
//!         .resolve_as(&QueryKey::from(["slots/slotById", "greet_slot"]))
//!         .await?;
//!
//!     // No network: which rule would serve this key?
//!     let plan = router.explain(&QueryKey::from(["auth/me"]));
//!     assert_eq!(plan.route, "auth");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module runs fake backends that record every request:
//!
//! ```rust,ignore
//! use console_router::testing::TestBackends;
//!
//! let backends = TestBackends::start().await?;
//! let router = backends.router(false, &["fixtures/"])?;
//! ```

mod backend;
mod config;
mod error;
mod key;
pub mod route;
mod router;
pub mod stream;
pub mod testing;

pub use backend::{BackendClient, BackendKind, BackendSet};
pub use config::{BackendConfig, BackendsConfig, ConsoleConfig, ENV_LOCAL, ENV_MOCKED_ENDPOINTS};
pub use error::{ConsoleError, Result};
pub use key::{QueryKey, Token};
pub use route::{Route, RouteContext, RouteTable};
pub use router::{Payload, RequestRouter, RoutePlan};

// Re-export streaming types for convenience
pub use stream::{EventStream, ServerEvent, StreamError};
