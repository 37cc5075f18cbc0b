pub mod request;

pub use request::{JsonMap, OutboundRequest, RequestRecord, RequestStatus, StatusCounts};
