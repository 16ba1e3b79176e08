// ==========================================
// 喷涂线引擎 - 喷房日产能
// ==========================================
// 职责: 日配额使用情况汇总 + 超额提示
// 红线: 超额只提示，不阻断登记
// ==========================================

use crate::domain::cabin::{Cabin, Gun, Oven};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// CabinQuota - 喷房当日配额快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CabinQuota {
    pub name: String,
    pub pieces_today: i64,
    pub pieces_remaining: i64,
    pub percent_used: f64,
    pub exceeded_quota: bool,
    pub guns: Vec<String>,
    pub ovens: Vec<String>,
}

impl CabinQuota {
    /// 由当日件数（已做日期翻转）构建配额快照
    ///
    /// max_daily_pieces ≤ 0 表示未配置配额：不计剩余、不判超额
    pub fn build(cabin: &Cabin, pieces_today: i64, guns: &[Gun], ovens: &[Oven]) -> Self {
        let max = cabin.max_daily_pieces;
        let (pieces_remaining, percent_used, exceeded_quota) = if max > 0 {
            (
                (max - pieces_today).max(0),
                pieces_today as f64 / max as f64 * 100.0,
                pieces_today > max,
            )
        } else {
            (0, 0.0, false)
        };

        Self {
            name: cabin.name.clone(),
            pieces_today,
            pieces_remaining,
            percent_used,
            exceeded_quota,
            guns: guns.iter().map(|g| g.name.clone()).collect(),
            ovens: ovens.iter().map(|o| o.name.clone()).collect(),
        }
    }

    /// 以 today 解释喷房存储计数后构建
    pub fn for_day(cabin: &Cabin, today: NaiveDate, guns: &[Gun], ovens: &[Oven]) -> Self {
        Self::build(cabin, cabin.pieces_today_on(today), guns, ovens)
    }
}

/// 超额提示
///
/// # 参数
/// - `pieces_before`: 登记前当日件数（已做日期翻转）
/// - `quantity`: 本次件数
/// - `max_daily_pieces`: 日配额
///
/// # 返回
/// 超出配额时返回提示文本，否则 None
pub fn capacity_warning(
    cabin_name: &str,
    pieces_before: i64,
    quantity: i64,
    max_daily_pieces: i64,
) -> Option<String> {
    if max_daily_pieces <= 0 {
        return None;
    }
    let total = pieces_before + quantity;
    if total <= max_daily_pieces {
        return None;
    }
    Some(format!(
        "喷房 {} 当日产能超额: {} 件 / 配额 {} 件（超出 {} 件）",
        cabin_name,
        total,
        max_daily_pieces,
        total - max_daily_pieces
    ))
}
