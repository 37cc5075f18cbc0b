//! # Balancer Testing Utils
//!
//! 各个 crate 共用的测试工具：可控的上游替身、配置构造器以及等待辅助函数。
//!
//! ```toml
//! [dev-dependencies]
//! balancer-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
