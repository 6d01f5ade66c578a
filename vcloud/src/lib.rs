pub mod api;
pub mod logging;

pub use api::{ApiError, Client, ClientConfig};
