pub mod repository;
pub mod upstream;

pub use repository::RequestRepository;
pub use upstream::UpstreamClient;
