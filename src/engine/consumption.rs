// ==========================================
// 喷涂线引擎 - 耗漆计算
// ==========================================
// 职责: 按策略估算每件耗漆量（kg）
// 输入: 工件面积 + 膜厚(µm) + 密度(g/cm³)
// 输出: 单件 / 批次耗漆量
// ==========================================
// 公式:
//   Standard:    w * h * t * ρ / 1000 * 1.10
//   HighDensity: w * h * t * (ρ * 1.5) / 1000 * 1.15
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 标准策略损耗系数
pub const STANDARD_WASTE_FACTOR: f64 = 1.10;
/// 高密度策略的密度放大系数
pub const HIGH_DENSITY_DENSITY_FACTOR: f64 = 1.5;
/// 高密度策略损耗系数
pub const HIGH_DENSITY_WASTE_FACTOR: f64 = 1.15;

// ==========================================
// ConsumptionStrategy - 耗漆策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumptionStrategy {
    #[default]
    Standard,
    HighDensity,
}

impl ConsumptionStrategy {
    /// 解析策略标签（大小写不敏感，未知标签回退 Standard）
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "highdensity" | "high_density" | "high-density" => ConsumptionStrategy::HighDensity,
            "standard" => ConsumptionStrategy::Standard,
            other => {
                tracing::debug!(tag = other, "未知耗漆策略，按 standard 处理");
                ConsumptionStrategy::Standard
            }
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            ConsumptionStrategy::Standard => "standard",
            ConsumptionStrategy::HighDensity => "highdensity",
        }
    }

    /// 单件耗漆量（kg）
    ///
    /// # 参数
    /// - `width_m` / `height_m`: 工件尺寸（米）
    /// - `thickness_um`: 膜厚（微米）
    /// - `density_g_cm3`: 油漆密度（g/cm³）
    pub fn consumption_kg_per_piece(
        &self,
        width_m: f64,
        height_m: f64,
        thickness_um: f64,
        density_g_cm3: f64,
    ) -> f64 {
        let area = width_m * height_m;
        match self {
            ConsumptionStrategy::Standard => {
                area * thickness_um * density_g_cm3 / 1000.0 * STANDARD_WASTE_FACTOR
            }
            ConsumptionStrategy::HighDensity => {
                area * thickness_um * (density_g_cm3 * HIGH_DENSITY_DENSITY_FACTOR) / 1000.0
                    * HIGH_DENSITY_WASTE_FACTOR
            }
        }
    }

    /// 批次总耗漆量（kg）
    pub fn consumption_kg_total(
        &self,
        width_m: f64,
        height_m: f64,
        thickness_um: f64,
        density_g_cm3: f64,
        quantity: i64,
    ) -> f64 {
        self.consumption_kg_per_piece(width_m, height_m, thickness_um, density_g_cm3)
            * quantity as f64
    }
}

impl fmt::Display for ConsumptionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_standard_two_square_meters() {
        let kg = ConsumptionStrategy::Standard.consumption_kg_per_piece(2.0, 1.0, 50.0, 1.2);
        assert!(approx(kg, 0.132), "got {}", kg);
    }

    #[test]
    fn test_high_density_two_square_meters() {
        let kg = ConsumptionStrategy::HighDensity.consumption_kg_per_piece(2.0, 1.0, 50.0, 1.2);
        assert!(approx(kg, 0.207), "got {}", kg);
    }

    #[test]
    fn test_total_scales_with_quantity() {
        let total = ConsumptionStrategy::Standard.consumption_kg_total(2.0, 1.0, 50.0, 1.2, 10);
        assert!(approx(total, 1.32));
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!(ConsumptionStrategy::from_tag("HighDensity"), ConsumptionStrategy::HighDensity);
        assert_eq!(ConsumptionStrategy::from_tag("high_density"), ConsumptionStrategy::HighDensity);
        assert_eq!(ConsumptionStrategy::from_tag(" high-density "), ConsumptionStrategy::HighDensity);
        assert_eq!(ConsumptionStrategy::from_tag("STANDARD"), ConsumptionStrategy::Standard);
        assert_eq!(ConsumptionStrategy::from_tag("metallic"), ConsumptionStrategy::Standard);
        assert_eq!(ConsumptionStrategy::HighDensity.to_string(), "highdensity");
    }
}
