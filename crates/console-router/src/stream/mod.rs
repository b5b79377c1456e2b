//! Server-sent event streams
//!
//! The staged backend pushes live chat activity over SSE. The router hands
//! the open connection back to the caller as an [`EventStream`], which
//! yields one [`ServerEvent`] per dispatched SSE event.
//!
//! ```no_run
//! use console_router::{ConsoleConfig, Payload, QueryKey, RequestRouter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = RequestRouter::from_config(&ConsoleConfig::default())?;
//! let key = QueryKey::from(["cs-get-all-active-chats", "prod"]);
//!
//! if let Payload::Stream(mut events) = router.resolve(&key).await? {
//!     while let Some(event) = events.next().await {
//!         println!("{}", event?.data);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod event_stream;
mod parser;
mod types;

pub use event_stream::EventStream;
pub use types::{ServerEvent, StreamError, StreamResult};
