// ==========================================
// 喷涂线引擎 - 设备告警领域模型
// ==========================================
// 职责: 维护类告警（由告警评估生成，由外部界面标记已读）
// ==========================================

use crate::domain::types::{AlertSeverity, EquipmentKind, WearLevel};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// AlertDraft - 待持久化告警
// ==========================================
// 告警评估的纯输出，不含主键与时间戳
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDraft {
    pub equipment_kind: EquipmentKind,
    pub equipment_id: i64,
    pub equipment_name: String,
    pub level: WearLevel, // 告警种类即磨损等级
    pub severity: AlertSeverity,
    pub wear_ratio: f64,
    pub message: String,
}

// ==========================================
// Alert - 已持久化告警
// ==========================================
// 对齐: equipment_alert 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: i64,
    pub equipment_kind: EquipmentKind,
    pub equipment_id: i64,
    pub equipment_name: String,
    pub alert_kind: WearLevel,
    pub message: String,
    pub severity: AlertSeverity,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
    pub batch_id: Option<i64>,
}
