//! Public request, batch and stats types.

pub mod batch;
pub mod request;
pub mod stats;

pub use batch::{BatchRequest, BatchResults};
pub use request::{FormPart, HttpMethod, MultipartForm, RequestBody, RequestOptions};
pub use stats::RequestStats;
