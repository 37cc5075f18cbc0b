pub mod errors;
pub mod models;
pub mod traits;

pub use errors::*;
pub use models::{JsonMap, OutboundRequest, RequestRecord, RequestStatus, StatusCounts};
pub use traits::{RequestRepository, UpstreamClient};
