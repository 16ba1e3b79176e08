// ==========================================
// 喷涂线引擎 - 喷房与设备领域模型
// ==========================================
// 红线: 设备使用小时单调不减，只能由用量核算增加
// 红线: 喷房当日计数按日期惰性归零（首次写入新日期时）
// ==========================================

use crate::domain::types::{EquipmentKind, OperationalStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Cabin - 喷房
// ==========================================
// 对齐: cabin 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cabin {
    pub cabin_id: i64,
    pub name: String,
    pub status: OperationalStatus,
    pub max_daily_pieces: i64,                // 日产能配额（件）
    pub pieces_today: i64,                    // 当日已喷涂件数（存储值，可能属于旧日期）
    pub last_activity_date: Option<NaiveDate>, // 最近一次写入计数的日期
}

impl Cabin {
    /// 存储的当日计数是否已过期
    pub fn needs_day_rollover(&self, today: NaiveDate) -> bool {
        self.last_activity_date != Some(today)
    }

    /// 按给定日期解释的当日件数（过期则视为 0）
    pub fn pieces_today_on(&self, today: NaiveDate) -> i64 {
        if self.needs_day_rollover(today) {
            0
        } else {
            self.pieces_today
        }
    }

    /// 应用日期翻转（仅内存）
    pub fn roll_day(&mut self, today: NaiveDate) {
        if self.needs_day_rollover(today) {
            self.pieces_today = 0;
            self.last_activity_date = Some(today);
        }
    }
}

// ==========================================
// Gun - 喷枪
// ==========================================
// 对齐: gun 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gun {
    pub gun_id: i64,
    pub name: String,
    pub status: OperationalStatus,
    pub usage_hours: f64,
    pub maintenance_interval_hours: f64,
    pub last_maintenance_date: Option<NaiveDate>,
}

// ==========================================
// Oven - 烘炉
// ==========================================
// 对齐: oven 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Oven {
    pub oven_id: i64,
    pub name: String,
    pub status: OperationalStatus,
    pub usage_hours: f64,
    pub maintenance_interval_hours: f64,
    pub last_maintenance_date: Option<NaiveDate>,
    pub max_temperature_c: f64,
    pub gas_per_hour: f64, // 每小时燃气消耗
}

// ==========================================
// Trait: WearMonitor
// ==========================================
// 用途: 喷枪/烘炉统一的磨损读数接口
pub trait WearMonitor {
    fn equipment_kind(&self) -> EquipmentKind;
    fn equipment_id(&self) -> i64;
    fn equipment_name(&self) -> &str;
    fn usage_hours(&self) -> f64;
    fn maintenance_interval_hours(&self) -> f64;
    fn last_maintenance_date(&self) -> Option<NaiveDate>;

    /// 磨损比例 usage_hours / maintenance_interval_hours
    ///
    /// 维护周期未配置（≤ 0）时返回 None
    fn wear_ratio(&self) -> Option<f64> {
        let interval = self.maintenance_interval_hours();
        if interval <= 0.0 {
            return None;
        }
        Some(self.usage_hours() / interval)
    }

    /// 距下次维护的剩余小时（最小为 0）
    fn remaining_hours(&self) -> f64 {
        (self.maintenance_interval_hours() - self.usage_hours()).max(0.0)
    }

    /// 生成快照（用于告警评估）
    fn snapshot(&self) -> EquipmentSnapshot {
        EquipmentSnapshot {
            kind: self.equipment_kind(),
            equipment_id: self.equipment_id(),
            name: self.equipment_name().to_string(),
            usage_hours: self.usage_hours(),
            maintenance_interval_hours: self.maintenance_interval_hours(),
            last_maintenance_date: self.last_maintenance_date(),
        }
    }
}

impl WearMonitor for Gun {
    fn equipment_kind(&self) -> EquipmentKind {
        EquipmentKind::Gun
    }
    fn equipment_id(&self) -> i64 {
        self.gun_id
    }
    fn equipment_name(&self) -> &str {
        &self.name
    }
    fn usage_hours(&self) -> f64 {
        self.usage_hours
    }
    fn maintenance_interval_hours(&self) -> f64 {
        self.maintenance_interval_hours
    }
    fn last_maintenance_date(&self) -> Option<NaiveDate> {
        self.last_maintenance_date
    }
}

impl WearMonitor for Oven {
    fn equipment_kind(&self) -> EquipmentKind {
        EquipmentKind::Oven
    }
    fn equipment_id(&self) -> i64 {
        self.oven_id
    }
    fn equipment_name(&self) -> &str {
        &self.name
    }
    fn usage_hours(&self) -> f64 {
        self.usage_hours
    }
    fn maintenance_interval_hours(&self) -> f64 {
        self.maintenance_interval_hours
    }
    fn last_maintenance_date(&self) -> Option<NaiveDate> {
        self.last_maintenance_date
    }
}

// ==========================================
// EquipmentSnapshot - 设备磨损快照
// ==========================================
// 用途: 告警评估的输入（与具体设备类型解耦）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    pub kind: EquipmentKind,
    pub equipment_id: i64,
    pub name: String,
    pub usage_hours: f64,
    pub maintenance_interval_hours: f64,
    pub last_maintenance_date: Option<NaiveDate>,
}

impl WearMonitor for EquipmentSnapshot {
    fn equipment_kind(&self) -> EquipmentKind {
        self.kind
    }
    fn equipment_id(&self) -> i64 {
        self.equipment_id
    }
    fn equipment_name(&self) -> &str {
        &self.name
    }
    fn usage_hours(&self) -> f64 {
        self.usage_hours
    }
    fn maintenance_interval_hours(&self) -> f64 {
        self.maintenance_interval_hours
    }
    fn last_maintenance_date(&self) -> Option<NaiveDate> {
        self.last_maintenance_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cabin(pieces_today: i64, last: Option<NaiveDate>) -> Cabin {
        Cabin {
            cabin_id: 1,
            name: "Cabina 1".to_string(),
            status: OperationalStatus::Active,
            max_daily_pieces: 100,
            pieces_today,
            last_activity_date: last,
        }
    }

    #[test]
    fn test_day_rollover() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

        let cabin = make_cabin(40, Some(today));
        assert!(!cabin.needs_day_rollover(today));
        assert_eq!(cabin.pieces_today_on(today), 40);

        let mut stale = make_cabin(40, Some(yesterday));
        assert_eq!(stale.pieces_today_on(today), 0);
        stale.roll_day(today);
        assert_eq!(stale.pieces_today, 0);
        assert_eq!(stale.last_activity_date, Some(today));

        let never = make_cabin(12, None);
        assert_eq!(never.pieces_today_on(today), 0);
    }

    #[test]
    fn test_wear_ratio() {
        let gun = Gun {
            gun_id: 3,
            name: "Pistola A".to_string(),
            status: OperationalStatus::Active,
            usage_hours: 45.0,
            maintenance_interval_hours: 50.0,
            last_maintenance_date: None,
        };
        assert!((gun.wear_ratio().unwrap() - 0.9).abs() < 1e-12);
        assert!((gun.remaining_hours() - 5.0).abs() < 1e-12);

        let snapshot = gun.snapshot();
        assert_eq!(snapshot.kind, EquipmentKind::Gun);
        assert_eq!(snapshot.equipment_id, 3);

        let mut unconfigured = snapshot.clone();
        unconfigured.maintenance_interval_hours = 0.0;
        assert!(unconfigured.wear_ratio().is_none());
    }
}
