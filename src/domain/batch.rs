// ==========================================
// 喷涂线引擎 - 喷涂批次与用量事件
// ==========================================
// 红线: 批次一经创建不可修改（开票数量除外，由外部维护）
// 红线: 用量事件只追加
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// PaintedBatch - 喷涂批次
// ==========================================
// 对齐: painted_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaintedBatch {
    pub batch_id: i64,
    pub piece_id: i64,
    pub paint_id: i64,
    pub cabin_id: i64,
    pub quantity: i64,
    pub strategy: String,        // 耗漆策略标签
    pub consumption_kg: f64,     // 预估总耗漆量
    pub created_at: NaiveDateTime,
    pub invoiced_quantity: i64,  // 已开票数量（初始 0）
    pub actor: String,
}

// ==========================================
// NewPaintedBatch - 待插入批次
// ==========================================
#[derive(Debug, Clone)]
pub struct NewPaintedBatch {
    pub piece_id: i64,
    pub paint_id: i64,
    pub cabin_id: i64,
    pub quantity: i64,
    pub strategy: String,
    pub consumption_kg: f64,
    pub created_at: NaiveDateTime,
    pub actor: String,
}

// ==========================================
// BatchKey - 防重键
// ==========================================
// 同一 (工件, 油漆, 喷房, 数量) 在时间窗内只允许一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchKey {
    pub piece_id: i64,
    pub paint_id: i64,
    pub cabin_id: i64,
    pub quantity: i64,
}

impl NewPaintedBatch {
    pub fn key(&self) -> BatchKey {
        BatchKey {
            piece_id: self.piece_id,
            paint_id: self.paint_id,
            cabin_id: self.cabin_id,
            quantity: self.quantity,
        }
    }
}

// ==========================================
// UsageEvent - 喷房用量事件
// ==========================================
// 对齐: usage_event 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub event_id: i64,
    pub cabin_id: i64,
    pub batch_id: Option<i64>,
    pub event_date: NaiveDate,
    pub pieces_painted: i64,
    pub hours_worked: f64,
    pub gas_consumed: f64,
    pub created_at: NaiveDateTime,
}
