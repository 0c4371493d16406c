//! Polling inbox client for the pulse delivery API.
//!
//! [`HttpDelivery`] talks to the server, [`Inbox`] holds the merged feed and
//! its optimistic read states, and [`InboxDriver`] ties the two together on
//! a single task.

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod inbox;

pub use api::DeliveryApi;
pub use config::ClientConfig;
pub use driver::{InboxCommand, InboxDriver, InboxHandle, InboxView};
pub use error::ClientError;
pub use http::HttpDelivery;
pub use inbox::{Channel, Compose, ComposeStatus, Direction, FeedStatus, Inbox, InboxItem, ItemKey, ReadState, Snapshot};
