//! # Network Layer
//!
//! Request and response values exchanged between the page, the worker and
//! the network, plus the [`Fetcher`] seam the strategies fetch through.

mod fetcher;
mod request;
mod response;

pub use fetcher::{Fetcher, HttpFetcher, create_client};
pub use request::{Destination, Request};
pub use response::{OFFLINE_BODY, Response};
pub(crate) use response::ResponseHead;
