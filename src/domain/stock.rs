// ==========================================
// 喷涂线引擎 - 库存领域模型
// ==========================================
// 红线: 可用库存 = 已收货 - 已喷涂，任何时刻不得为负
// 红线: 油漆剩余重量扣减后不得为负
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Piece - 待喷涂工件
// ==========================================
// 对齐: piece 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub piece_id: i64,
    pub client_id: Option<i64>,
    pub description: String,

    // ===== 几何尺寸 =====
    pub width_m: f64,
    pub height_m: f64,

    // ===== 库存计数 =====
    pub total_received: i64, // 累计收货（送货单）
    pub total_painted: i64,  // 累计喷涂（仅本引擎写入）
    pub total_invoiced: i64, // 累计开票（外部维护）
}

impl Piece {
    /// 可用库存（已收货 - 已喷涂）
    pub fn stock_available(&self) -> i64 {
        self.total_received - self.total_painted
    }

    /// 单件面积 (m²)
    pub fn area_m2(&self) -> f64 {
        self.width_m * self.height_m
    }
}

// ==========================================
// Paint - 油漆（品牌/颜色/类型）
// ==========================================
// 对齐: paint 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paint {
    pub paint_id: i64,
    pub brand: String,
    pub color: String,
    pub paint_type: String,
    pub remaining_kg: f64,
}

impl Paint {
    /// 展示名称
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.brand, self.color, self.paint_type)
    }
}
