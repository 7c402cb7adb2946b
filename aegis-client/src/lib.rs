pub mod client;
pub mod error;
pub mod result;

pub use client::ApiClient;
pub use error::{ClientError, Result};
pub use result::ApiResponse;
