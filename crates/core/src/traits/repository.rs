//! 请求存储接口
//!
//! 准入、分发和查询三条路径共享同一个存储，实现必须保证：
//! - 每次读写都是线程安全的
//! - 状态迁移 Waiting → Done/Failed 相对并发读取是原子的
//! - 记录只增不减，没有删除和淘汰

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{JsonMap, RequestRecord, StatusCounts};
use crate::BalancerResult;

#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// 插入新记录，ID重复时返回错误
    async fn insert(&self, record: RequestRecord) -> BalancerResult<()>;

    async fn get(&self, id: Uuid) -> BalancerResult<Option<RequestRecord>>;

    /// 标记为完成。记录不存在时返回 `LookupError::NotFound`，
    /// 已处于终态时返回 `Ok(false)`。
    async fn mark_done(&self, id: Uuid, response_body: JsonMap) -> BalancerResult<bool>;

    async fn mark_failed(&self, id: Uuid, reason: String) -> BalancerResult<bool>;

    async fn count_by_status(&self) -> BalancerResult<StatusCounts>;
}
