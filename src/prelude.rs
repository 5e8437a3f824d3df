//! Convenience re-exports for common use.

pub use crate::config::{ClientConfig, SessionAuth};
pub use crate::error::{ApiError, Result};
pub use crate::manager::RequestManager;
pub use crate::transport::{HttpTransport, RawResponse, Transport};
pub use crate::types::{
    BatchRequest, BatchResults, HttpMethod, MultipartForm, RequestBody, RequestOptions,
    RequestStats,
};
pub use crate::util::key::KeyStrategy;
pub use crate::util::retry::RetryPolicy;
