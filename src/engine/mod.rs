// ==========================================
// 喷涂线引擎 - 引擎层
// ==========================================
// 职责: 登记业务规则（耗漆、分摊、告警、产能）与登记工作单元
// 红线: 纯计算模块不访问数据库；SQL 只在 repository 层
// ==========================================

pub mod alert;
pub mod capacity;
pub mod consumption;
pub mod error;
pub mod registrar;
pub mod usage;

// 重导出核心引擎
pub use alert::{evaluate_alerts, AlertEvaluator, MaintenanceRow, WearThresholds};
pub use capacity::{capacity_warning, CabinQuota};
pub use consumption::ConsumptionStrategy;
pub use error::{RegistrationError, RegistrationResult};
pub use registrar::{
    BatchRegistrar, RegistrationOutcome, RegistrationRequest, RegistrationState,
    RegistrationSummary,
};
pub use usage::UsageAllocation;
