// ==========================================
// 喷涂线引擎 - 核心库
// ==========================================
// 职责: 喷涂批次登记（耗漆、库存、设备工时、告警）与设备健康查询
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 登记规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 性能观测（SQL 计数/慢 SQL）
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 启动装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AlertSeverity, EquipmentKind, OperationalStatus, WearLevel};

// 领域实体
pub use domain::{ActionLog, ActionType, Alert, Cabin, Gun, Oven, Paint, PaintedBatch, Piece};

// 引擎
pub use engine::{
    AlertEvaluator, BatchRegistrar, ConsumptionStrategy, RegistrationOutcome,
    RegistrationRequest, UsageAllocation,
};

// API
pub use api::{ApiError, ProductionApi, SessionContext};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "喷涂线生产登记引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
