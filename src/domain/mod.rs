// ==========================================
// 喷涂线引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod alert;
pub mod batch;
pub mod cabin;
pub mod stock;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use alert::{Alert, AlertDraft};
pub use batch::{BatchKey, NewPaintedBatch, PaintedBatch, UsageEvent};
pub use cabin::{Cabin, EquipmentSnapshot, Gun, Oven, WearMonitor};
pub use stock::{Paint, Piece};
pub use types::{AlertSeverity, EquipmentKind, OperationalStatus, WearLevel};
