// ==========================================
// 喷涂线引擎 - 操作日志（审计）领域模型
// ==========================================
// 红线: 每次成功登记必须写一条审计记录（含扣减前后数量）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,        // UUID v4
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人

    // ===== 关联实体 =====
    pub entity: Option<String>,    // 实体名，如 painted_batch
    pub entity_id: Option<String>, // 实体主键

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>, // 扣减前后数量等
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    RegisterBatch, // 登记喷涂批次
    MarkAlertRead, // 告警标记已读
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RegisterBatch => "RegisterBatch",
            ActionType::MarkAlertRead => "MarkAlertRead",
        }
    }
}

impl ActionLog {
    /// 创建新的操作日志（自动生成 action_id）
    pub fn new(action_type: ActionType, actor: &str, action_ts: NaiveDateTime) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts,
            actor: actor.to_string(),
            entity: None,
            entity_id: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_entity(mut self, entity: &str, entity_id: impl ToString) -> Self {
        self.entity = Some(entity.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
