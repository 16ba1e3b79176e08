// ==========================================
// 喷涂线引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_tx` 关联函数只在登记事务内调用，其余方法自行加锁取连接
// ==========================================

pub mod action_log_repo;
pub mod alert_repo;
pub mod batch_repo;
pub mod equipment_repo;
pub mod error;
pub mod stock_repo;
pub mod usage_event_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use alert_repo::AlertRepository;
pub use batch_repo::PaintedBatchRepository;
pub use equipment_repo::EquipmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use stock_repo::StockRepository;
pub use usage_event_repo::UsageEventRepository;
