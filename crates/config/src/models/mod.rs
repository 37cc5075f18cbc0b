pub mod app_config;
pub mod dispatcher;
pub mod limits;
pub mod logging;
pub mod observability;
pub mod server;

pub use app_config::*;
pub use dispatcher::*;
pub use limits::*;
pub use logging::*;
pub use observability::*;
pub use server::*;
