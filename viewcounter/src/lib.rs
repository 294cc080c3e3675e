//! Page-view counter: two JSON endpoints over a tiny HTTP/1.1 server.
//!
//! `GET /api/views` reports the current count, `POST /api/views/increment`
//! bumps it by one and reports the new value.

mod error;
pub mod http;
pub mod routes;
pub mod schema;
pub mod storage;

pub use error::{CounterError, Result};
pub use schema::{ErrorBody, ViewsResponse, INCREMENT_PATH, VIEWS_PATH};
pub use storage::{FileStorage, MemStorage, ViewStorage};
