// ==========================================
// 喷涂线引擎 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 运行状态 (Operational Status)
// ==========================================
// 喷房、喷枪、烘炉共用同一套状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalStatus {
    Active,      // 运行中
    Maintenance, // 维护中
    Inactive,    // 停用
}

impl OperationalStatus {
    /// 转换为数据库字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OperationalStatus::Active => "ACTIVE",
            OperationalStatus::Maintenance => "MAINTENANCE",
            OperationalStatus::Inactive => "INACTIVE",
        }
    }

    /// 从数据库字符串解析（未知值按停用处理，不会误判为可用）
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => OperationalStatus::Active,
            "MAINTENANCE" => OperationalStatus::Maintenance,
            _ => OperationalStatus::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, OperationalStatus::Active)
    }
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 设备类型 (Equipment Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentKind {
    Gun,  // 喷枪
    Oven, // 烘炉
}

impl EquipmentKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EquipmentKind::Gun => "GUN",
            EquipmentKind::Oven => "OVEN",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GUN" => Some(EquipmentKind::Gun),
            "OVEN" => Some(EquipmentKind::Oven),
            _ => None,
        }
    }

    /// 展示名称（用于告警消息）
    pub fn label(&self) -> &'static str {
        match self {
            EquipmentKind::Gun => "喷枪",
            EquipmentKind::Oven => "烘炉",
        }
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 磨损等级 (Wear Level)
// ==========================================
// 红线: 等级制，按 usage_hours / maintenance_interval_hours 划分
// 顺序: Ok < Programar < Pronto < Urgente
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WearLevel {
    Ok,        // < 80%
    Programar, // ≥ 80%，安排维护
    Pronto,    // ≥ 90%，尽快维护
    Urgente,   // ≥ 100%，已超维护周期
}

impl WearLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WearLevel::Ok => "OK",
            WearLevel::Programar => "PROGRAMAR",
            WearLevel::Pronto => "PRONTO",
            WearLevel::Urgente => "URGENTE",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROGRAMAR" => WearLevel::Programar,
            "PRONTO" => WearLevel::Pronto,
            "URGENTE" => WearLevel::Urgente,
            _ => WearLevel::Ok,
        }
    }

    /// 是否需要产生告警
    pub fn needs_alert(&self) -> bool {
        *self >= WearLevel::Programar
    }

    /// 对应的告警严重度
    pub fn severity(&self) -> Option<AlertSeverity> {
        match self {
            WearLevel::Ok => None,
            WearLevel::Programar => Some(AlertSeverity::Low),
            WearLevel::Pronto => Some(AlertSeverity::Medium),
            WearLevel::Urgente => Some(AlertSeverity::High),
        }
    }
}

impl fmt::Display for WearLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 告警严重度 (Alert Severity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => AlertSeverity::High,
            "MEDIUM" => AlertSeverity::Medium,
            _ => AlertSeverity::Low,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
