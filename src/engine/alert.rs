// ==========================================
// 喷涂线引擎 - 设备磨损告警评估
// ==========================================
// 职责: 磨损比例分级 + 生成告警草稿 + 维护报表
// 输入: 设备快照 (EquipmentSnapshot)
// 输出: AlertDraft 列表（纯计算，不落库）
// ==========================================
// 规则:
//   ratio = usage_hours / maintenance_interval_hours
//   ratio >= urgente   → URGENTE  (HIGH)
//   ratio >= pronto    → PRONTO   (MEDIUM)
//   ratio >= programar → PROGRAMAR (LOW)
//   否则 / 未配置周期   → OK（不生成告警）
// ==========================================

use crate::domain::alert::AlertDraft;
use crate::domain::cabin::{EquipmentSnapshot, WearMonitor};
use crate::domain::types::{EquipmentKind, WearLevel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 磨损比例比较容差：小时数经多次 REAL 累加后会略低于名义值
pub const WEAR_RATIO_EPSILON: f64 = 1e-9;

// ==========================================
// WearThresholds - 分级阈值
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WearThresholds {
    pub programar: f64,
    pub pronto: f64,
    pub urgente: f64,
}

impl Default for WearThresholds {
    fn default() -> Self {
        Self {
            programar: 0.80,
            pronto: 0.90,
            urgente: 1.00,
        }
    }
}

impl WearThresholds {
    /// 阈值必须为正且严格递增
    pub fn is_valid(&self) -> bool {
        self.programar > 0.0 && self.programar < self.pronto && self.pronto < self.urgente
    }

    /// 按比例分级；None（周期未配置）视为 OK
    pub fn classify(&self, ratio: Option<f64>) -> WearLevel {
        let Some(ratio) = ratio else {
            return WearLevel::Ok;
        };
        let ratio = ratio + WEAR_RATIO_EPSILON;
        if ratio >= self.urgente {
            WearLevel::Urgente
        } else if ratio >= self.pronto {
            WearLevel::Pronto
        } else if ratio >= self.programar {
            WearLevel::Programar
        } else {
            WearLevel::Ok
        }
    }
}

// ==========================================
// MaintenanceRow - 维护报表行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRow {
    pub equipment_kind: EquipmentKind,
    pub equipment_id: i64,
    pub equipment_name: String,
    pub usage_hours: f64,
    pub maintenance_interval_hours: f64,
    pub wear_ratio: Option<f64>,
    pub wear_level: WearLevel,
    pub remaining_hours: f64,
    pub last_maintenance_date: Option<NaiveDate>,
}

// ==========================================
// AlertEvaluator - 告警评估器
// ==========================================
/// 无状态评估器，只持有阈值
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator {
    thresholds: WearThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: WearThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &WearThresholds {
        &self.thresholds
    }

    /// 单台设备分级
    pub fn classify<M: WearMonitor + ?Sized>(&self, unit: &M) -> WearLevel {
        self.thresholds.classify(unit.wear_ratio())
    }

    /// 为 PROGRAMAR 及以上的设备生成告警草稿
    pub fn evaluate_alerts(&self, snapshots: &[EquipmentSnapshot]) -> Vec<AlertDraft> {
        snapshots
            .iter()
            .filter_map(|snapshot| {
                let ratio = snapshot.wear_ratio()?;
                let level = self.thresholds.classify(Some(ratio));
                let severity = level.severity()?;
                Some(AlertDraft {
                    equipment_kind: snapshot.kind,
                    equipment_id: snapshot.equipment_id,
                    equipment_name: snapshot.name.clone(),
                    level,
                    severity,
                    wear_ratio: ratio,
                    message: format_alert_message(snapshot.kind, &snapshot.name, level, ratio),
                })
            })
            .collect()
    }

    /// 维护报表（最严重在前，同级按磨损比例降序）
    pub fn maintenance_report(&self, snapshots: &[EquipmentSnapshot]) -> Vec<MaintenanceRow> {
        let mut rows: Vec<MaintenanceRow> = snapshots
            .iter()
            .map(|s| MaintenanceRow {
                equipment_kind: s.kind,
                equipment_id: s.equipment_id,
                equipment_name: s.name.clone(),
                usage_hours: s.usage_hours,
                maintenance_interval_hours: s.maintenance_interval_hours,
                wear_ratio: s.wear_ratio(),
                wear_level: self.classify(s),
                remaining_hours: s.remaining_hours(),
                last_maintenance_date: s.last_maintenance_date,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.wear_level.cmp(&a.wear_level).then_with(|| {
                let ra = a.wear_ratio.unwrap_or(0.0);
                let rb = b.wear_ratio.unwrap_or(0.0);
                rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        rows
    }
}

/// 使用默认阈值评估
pub fn evaluate_alerts(snapshots: &[EquipmentSnapshot]) -> Vec<AlertDraft> {
    AlertEvaluator::default().evaluate_alerts(snapshots)
}

fn format_alert_message(kind: EquipmentKind, name: &str, level: WearLevel, ratio: f64) -> String {
    let action = match level {
        WearLevel::Urgente => "已超维护周期，需立即维护",
        WearLevel::Pronto => "需尽快维护",
        _ => "请安排维护",
    };
    format!(
        "{} {} {}: 磨损 {:.1}%，{}",
        kind.label(),
        name,
        level,
        ratio * 100.0,
        action
    )
}
