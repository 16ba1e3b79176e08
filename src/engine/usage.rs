// ==========================================
// 喷涂线引擎 - 设备用量分摊
// ==========================================
// 职责: 计算批次工时、每台设备分摊小时、燃气消耗
// 红线: 平均分摊，不按历史磨损加权
// ==========================================
// 说明: 纯计算；持久化由 BatchRegistrar 在事务内完成
// ==========================================

use crate::domain::cabin::Oven;
use serde::{Deserialize, Serialize};

// ==========================================
// UsageAllocation - 用量分摊结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageAllocation {
    pub hours_worked: f64,   // 批次总工时
    pub hours_per_gun: f64,  // 每支喷枪分摊
    pub hours_per_oven: f64, // 每台烘炉分摊
    pub gas_consumed: f64,   // 燃气 = 工时 * 平均每小时燃气
}

impl UsageAllocation {
    /// 计算分摊
    ///
    /// # 参数
    /// - `quantity`: 批次件数
    /// - `hours_per_piece`: 每件工时
    /// - `gun_count`: 喷房在用喷枪数
    /// - `ovens`: 喷房在用烘炉
    ///
    /// 设备数为 0 时对应分摊为 0（调用方应先做前置校验）
    pub fn compute(quantity: i64, hours_per_piece: f64, gun_count: usize, ovens: &[Oven]) -> Self {
        let hours_worked = quantity as f64 * hours_per_piece;

        let hours_per_gun = if gun_count > 0 {
            hours_worked / gun_count as f64
        } else {
            0.0
        };

        let (hours_per_oven, gas_consumed) = if ovens.is_empty() {
            (0.0, 0.0)
        } else {
            let mean_gas =
                ovens.iter().map(|o| o.gas_per_hour).sum::<f64>() / ovens.len() as f64;
            (hours_worked / ovens.len() as f64, hours_worked * mean_gas)
        };

        Self {
            hours_worked,
            hours_per_gun,
            hours_per_oven,
            gas_consumed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::OperationalStatus;

    fn oven(id: i64, gas: f64) -> Oven {
        Oven {
            oven_id: id,
            name: format!("Horno {}", id),
            status: OperationalStatus::Active,
            usage_hours: 0.0,
            maintenance_interval_hours: 500.0,
            last_maintenance_date: None,
            max_temperature_c: 200.0,
            gas_per_hour: gas,
        }
    }

    #[test]
    fn test_two_guns_one_oven() {
        let alloc = UsageAllocation::compute(10, 0.1, 2, &[oven(1, 3.0)]);
        assert!((alloc.hours_worked - 1.0).abs() < 1e-12);
        assert!((alloc.hours_per_gun - 0.5).abs() < 1e-12);
        assert!((alloc.hours_per_oven - 1.0).abs() < 1e-12);
        assert!((alloc.gas_consumed - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_gas_uses_mean_rate() {
        let alloc = UsageAllocation::compute(20, 0.1, 1, &[oven(1, 2.0), oven(2, 4.0)]);
        assert!((alloc.hours_per_oven - 1.0).abs() < 1e-12);
        assert!((alloc.gas_consumed - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_equipment_yields_zero_shares() {
        let alloc = UsageAllocation::compute(5, 0.1, 0, &[]);
        assert!((alloc.hours_worked - 0.5).abs() < 1e-12);
        assert_eq!(alloc.hours_per_gun, 0.0);
        assert_eq!(alloc.gas_consumed, 0.0);
    }
}
