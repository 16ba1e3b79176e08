// ==========================================
// 喷涂线引擎 - 批次登记引擎
// ==========================================
// 职责: 一次喷涂批次登记的完整工作单元
// 状态: Validating → Locking → Computing → Persisting → Committed
//       失败 → Aborted；时间窗内重复 → DuplicateDetected（正常结束）
// ==========================================
// 红线: 防重查询必须在取得写锁（BEGIN IMMEDIATE）之后执行
// 红线: 事务内任一步失败，整个事务回滚，不留部分写入
// 红线: 产能超额只提示，不阻断
// ==========================================

use crate::config::RegistrationConfig;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::alert::AlertDraft;
use crate::domain::batch::{BatchKey, NewPaintedBatch};
use crate::domain::cabin::{Cabin, EquipmentSnapshot, Gun, Oven, WearMonitor};
use crate::domain::stock::{Paint, Piece};
use crate::engine::alert::AlertEvaluator;
use crate::engine::capacity::{capacity_warning, CabinQuota};
use crate::engine::consumption::ConsumptionStrategy;
use crate::engine::error::{RegistrationError, RegistrationResult};
use crate::engine::usage::UsageAllocation;
use crate::repository::stock_repo::PAINT_MASS_EPSILON_KG;
use crate::repository::{
    ActionLogRepository, AlertRepository, EquipmentRepository, PaintedBatchRepository,
    RepositoryError, StockRepository, UsageEventRepository,
};
use chrono::{Duration, Local, NaiveDateTime};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::{Arc, Mutex};

// ==========================================
// RegistrationState - 登记状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationState {
    Validating,
    Locking,
    Computing,
    Persisting,
    Committed,
    Aborted,
    DuplicateDetected,
}

impl RegistrationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RegistrationState::Committed
                | RegistrationState::Aborted
                | RegistrationState::DuplicateDetected
        )
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 状态跟踪（只用于日志）
struct StateTracker {
    key: BatchKey,
    state: RegistrationState,
}

impl StateTracker {
    fn new(key: BatchKey) -> Self {
        Self {
            key,
            state: RegistrationState::Validating,
        }
    }

    fn advance(&mut self, next: RegistrationState) {
        tracing::debug!(
            piece_id = self.key.piece_id,
            cabin_id = self.key.cabin_id,
            from = %self.state,
            to = %next,
            "登记状态迁移"
        );
        self.state = next;
    }
}

// ==========================================
// RegistrationRequest - 登记请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub piece_id: i64,
    pub paint_id: i64,
    pub cabin_id: i64,
    pub quantity: i64,
    pub thickness_um: f64,
    pub density_g_cm3: f64,
    #[serde(default)]
    pub strategy: ConsumptionStrategy,
}

impl RegistrationRequest {
    pub fn key(&self) -> BatchKey {
        BatchKey {
            piece_id: self.piece_id,
            paint_id: self.paint_id,
            cabin_id: self.cabin_id,
            quantity: self.quantity,
        }
    }

    /// 输入校验（任何数据库访问之前）
    pub fn validate(&self) -> RegistrationResult<()> {
        if self.quantity <= 0 {
            return Err(RegistrationError::invalid_input(
                "quantity",
                format!("件数必须为正整数，实际 {}", self.quantity),
            ));
        }
        check_positive("thickness_um", self.thickness_um)?;
        check_positive("density_g_cm3", self.density_g_cm3)?;
        Ok(())
    }
}

fn check_positive(field: &str, value: f64) -> RegistrationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RegistrationError::invalid_input(
            field,
            format!("必须为有限正数，实际 {}", value),
        ));
    }
    Ok(())
}

// ==========================================
// RegistrationOutcome - 登记结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSummary {
    pub batch_id: i64,
    pub strategy: ConsumptionStrategy,
    pub consumption_per_piece_kg: f64,
    pub consumption_total_kg: f64,
    pub remaining_paint_kg: f64,
    pub piece_stock_remaining: i64,
    pub allocation: UsageAllocation,
    pub cabin: CabinQuota,
    pub capacity_warning: Option<String>,
    pub alerts: Vec<AlertDraft>,
    pub registered_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegistrationOutcome {
    Registered(Box<RegistrationSummary>),
    Duplicate {
        batch_id: i64,
        registered_at: NaiveDateTime,
    },
}

impl RegistrationOutcome {
    pub fn batch_id(&self) -> i64 {
        match self {
            RegistrationOutcome::Registered(summary) => summary.batch_id,
            RegistrationOutcome::Duplicate { batch_id, .. } => *batch_id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, RegistrationOutcome::Duplicate { .. })
    }

    pub fn state(&self) -> RegistrationState {
        match self {
            RegistrationOutcome::Registered(_) => RegistrationState::Committed,
            RegistrationOutcome::Duplicate { .. } => RegistrationState::DuplicateDetected,
        }
    }
}

// ==========================================
// BatchRegistrar - 批次登记引擎
// ==========================================
/// 每个工作线程持有自己的连接（同一数据库文件）
pub struct BatchRegistrar {
    conn: Arc<Mutex<Connection>>,
    config: RegistrationConfig,
    evaluator: AlertEvaluator,
}

impl BatchRegistrar {
    pub fn new(conn: Arc<Mutex<Connection>>, config: RegistrationConfig) -> Self {
        let evaluator = AlertEvaluator::new(config.thresholds);
        Self {
            conn,
            config,
            evaluator,
        }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// 以本地当前时间登记
    pub fn register(
        &self,
        request: &RegistrationRequest,
        actor: &str,
    ) -> RegistrationResult<RegistrationOutcome> {
        self.register_at(request, actor, Local::now().naive_local())
    }

    /// 以指定时间登记（日期翻转与防重时间窗均以 now 为准）
    pub fn register_at(
        &self,
        request: &RegistrationRequest,
        actor: &str,
        now: NaiveDateTime,
    ) -> RegistrationResult<RegistrationOutcome> {
        let mut tracker = StateTracker::new(request.key());
        let result = self.run(request, actor, now, &mut tracker);

        if let Err(err) = &result {
            let failed_in = tracker.state;
            tracker.advance(RegistrationState::Aborted);
            match err {
                RegistrationError::TransactionFailure(source) => {
                    tracing::error!(
                        state = %failed_in,
                        piece_id = request.piece_id,
                        paint_id = request.paint_id,
                        cabin_id = request.cabin_id,
                        quantity = request.quantity,
                        actor,
                        error = %source,
                        "批次登记事务失败，已回滚"
                    );
                }
                other => {
                    tracing::warn!(
                        state = %failed_in,
                        piece_id = request.piece_id,
                        cabin_id = request.cabin_id,
                        quantity = request.quantity,
                        error = %other,
                        "批次登记被拒绝"
                    );
                }
            }
        }
        result
    }

    fn run(
        &self,
        request: &RegistrationRequest,
        actor: &str,
        now: NaiveDateTime,
        tracker: &mut StateTracker,
    ) -> RegistrationResult<RegistrationOutcome> {
        request.validate()?;

        let key = request.key();
        let since = now - Duration::seconds(self.config.idempotency_window_secs);

        // ===== Validating: 事务外快速失败 =====
        if let Err(err) = self.check_outside_transaction(request) {
            // 相同提交的重试：库存已被首次登记扣减，应返回重复结果而非库存不足
            if matches!(err, RegistrationError::PreconditionFailed { .. }) {
                let probe = PaintedBatchRepository::new(self.conn.clone())
                    .find_recent_duplicate(&key, since, now)?;
                if let Some(existing) = probe {
                    tracker.advance(RegistrationState::DuplicateDetected);
                    tracing::info!(batch_id = existing.batch_id, "重复提交（时间窗内），已处理");
                    return Ok(RegistrationOutcome::Duplicate {
                        batch_id: existing.batch_id,
                        registered_at: existing.created_at,
                    });
                }
            }
            return Err(err);
        }

        // ===== Locking: 取得写锁 + 防重 =====
        tracker.advance(RegistrationState::Locking);
        let mut conn = self.conn.lock().map_err(|e| {
            RegistrationError::TransactionFailure(RepositoryError::LockError(e.to_string()))
        })?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RegistrationError::TransactionFailure(RepositoryError::from(e)))?;

        if let Some(existing) = PaintedBatchRepository::find_recent_duplicate_tx(&tx, &key, since, now)? {
            drop(tx);
            tracker.advance(RegistrationState::DuplicateDetected);
            tracing::info!(
                batch_id = existing.batch_id,
                piece_id = key.piece_id,
                cabin_id = key.cabin_id,
                "重复提交（时间窗内），已处理"
            );
            return Ok(RegistrationOutcome::Duplicate {
                batch_id: existing.batch_id,
                registered_at: existing.created_at,
            });
        }

        // ===== Computing: 基于锁定快照重新校验 =====
        tracker.advance(RegistrationState::Computing);
        let cabin = EquipmentRepository::get_cabin_tx(&tx, request.cabin_id)?;
        let guns = EquipmentRepository::list_active_guns_tx(&tx, request.cabin_id)?;
        let ovens = EquipmentRepository::list_active_ovens_tx(&tx, request.cabin_id)?;
        let piece = StockRepository::get_piece_tx(&tx, request.piece_id)?;
        let paint = StockRepository::get_paint_tx(&tx, request.paint_id)?;
        let (per_piece_kg, total_kg) =
            check_preconditions(request, &cabin, &guns, &ovens, &piece, &paint)?;

        let allocation = UsageAllocation::compute(
            request.quantity,
            self.config.hours_per_piece,
            guns.len(),
            &ovens,
        );
        tracing::debug!(
            per_piece_kg,
            total_kg,
            hours_worked = allocation.hours_worked,
            hours_per_gun = allocation.hours_per_gun,
            hours_per_oven = allocation.hours_per_oven,
            "耗漆与工时计算完成"
        );

        // ===== Persisting =====
        tracker.advance(RegistrationState::Persisting);
        let remaining_paint_kg =
            StockRepository::decrement_paint_tx(&tx, request.paint_id, total_kg)?;
        StockRepository::decrement_piece_stock_tx(&tx, request.piece_id, request.quantity)?;
        let piece_stock_remaining = piece.stock_available() - request.quantity;

        let batch_id = PaintedBatchRepository::insert_tx(
            &tx,
            &NewPaintedBatch {
                piece_id: request.piece_id,
                paint_id: request.paint_id,
                cabin_id: request.cabin_id,
                quantity: request.quantity,
                strategy: request.strategy.as_tag().to_string(),
                consumption_kg: total_kg,
                created_at: now,
                actor: actor.to_string(),
            },
        )?;

        let audit = ActionLog::new(ActionType::RegisterBatch, actor, now)
            .with_entity("painted_batch", batch_id)
            .with_payload(json!({
                "piece_id": request.piece_id,
                "paint_id": request.paint_id,
                "cabin_id": request.cabin_id,
                "quantity": request.quantity,
                "strategy": request.strategy.as_tag(),
                "consumption_per_piece_kg": per_piece_kg,
                "consumption_total_kg": total_kg,
                "piece_stock": {
                    "before": piece.stock_available(),
                    "after": piece_stock_remaining,
                },
                "paint_kg": {
                    "before": paint.remaining_kg,
                    "after": remaining_paint_kg,
                },
                "hours_worked": allocation.hours_worked,
                "gas_consumed": allocation.gas_consumed,
            }))
            .with_detail(format!(
                "喷房 {} 登记 {} 件，耗漆 {:.3} kg ({})",
                cabin.name,
                request.quantity,
                total_kg,
                paint.display_name()
            ));
        ActionLogRepository::insert_tx(&tx, &audit)?;

        for gun in &guns {
            EquipmentRepository::add_gun_hours_tx(&tx, gun.gun_id, allocation.hours_per_gun)?;
        }
        for oven in &ovens {
            EquipmentRepository::add_oven_hours_tx(&tx, oven.oven_id, allocation.hours_per_oven)?;
        }
        UsageEventRepository::append_tx(
            &tx,
            request.cabin_id,
            batch_id,
            now.date(),
            request.quantity,
            allocation.hours_worked,
            allocation.gas_consumed,
            now,
        )?;
        let pieces_today = EquipmentRepository::record_pieces_today_tx(
            &tx,
            request.cabin_id,
            now.date(),
            request.quantity,
        )?;
        let pieces_before = pieces_today - request.quantity;

        // 告警基于分摊后的小时数；覆盖喷房下全部已分配设备（维护中/停用的也评估）
        let snapshots: Vec<EquipmentSnapshot> = EquipmentRepository::list_assigned_guns_tx(
            &tx,
            request.cabin_id,
        )?
        .iter()
        .map(|g| g.snapshot())
        .chain(
            EquipmentRepository::list_assigned_ovens_tx(&tx, request.cabin_id)?
                .iter()
                .map(|o| o.snapshot()),
        )
        .collect();
        let alerts = self.evaluator.evaluate_alerts(&snapshots);
        for draft in &alerts {
            AlertRepository::insert_tx(&tx, draft, Some(batch_id), now)?;
        }

        tx.commit()
            .map_err(|e| RegistrationError::TransactionFailure(RepositoryError::from(e)))?;
        drop(conn);
        tracker.advance(RegistrationState::Committed);

        // ===== 提交后: 产能提示 =====
        let warning = capacity_warning(
            &cabin.name,
            pieces_before,
            request.quantity,
            cabin.max_daily_pieces,
        );
        if let Some(message) = &warning {
            tracing::warn!(cabin_id = request.cabin_id, pieces_today, "{}", message);
        }

        tracing::info!(
            batch_id,
            piece_id = request.piece_id,
            paint_id = request.paint_id,
            cabin_id = request.cabin_id,
            quantity = request.quantity,
            consumption_kg = total_kg,
            alerts = alerts.len(),
            actor,
            "喷涂批次登记完成"
        );

        Ok(RegistrationOutcome::Registered(Box::new(RegistrationSummary {
            batch_id,
            strategy: request.strategy,
            consumption_per_piece_kg: per_piece_kg,
            consumption_total_kg: total_kg,
            remaining_paint_kg,
            piece_stock_remaining,
            allocation,
            cabin: CabinQuota::build(&cabin, pieces_today, &guns, &ovens),
            capacity_warning: warning,
            alerts,
            registered_at: now,
        })))
    }

    /// 事务外的前置校验（各仓储自行加锁）
    fn check_outside_transaction(&self, request: &RegistrationRequest) -> RegistrationResult<()> {
        let equipment = EquipmentRepository::new(self.conn.clone());
        let stock = StockRepository::new(self.conn.clone());

        let cabin = equipment.get_cabin(request.cabin_id)?;
        let piece = stock.get_piece(request.piece_id)?;
        let paint = stock.get_paint(request.paint_id)?;
        let guns = equipment.list_active_guns(request.cabin_id)?;
        let ovens = equipment.list_active_ovens(request.cabin_id)?;

        check_preconditions(request, &cabin, &guns, &ovens, &piece, &paint)?;
        Ok(())
    }
}

/// 喷房、设备、库存前置条件
///
/// # 返回
/// (单件耗漆, 总耗漆)
fn check_preconditions(
    request: &RegistrationRequest,
    cabin: &Cabin,
    guns: &[Gun],
    ovens: &[Oven],
    piece: &Piece,
    paint: &Paint,
) -> RegistrationResult<(f64, f64)> {
    if !cabin.status.is_active() {
        return Err(RegistrationError::precondition(format!(
            "喷房 {} 当前状态为 {}，不可登记",
            cabin.name, cabin.status
        )));
    }
    if guns.is_empty() {
        return Err(RegistrationError::precondition(format!(
            "喷房 {} 没有在用喷枪",
            cabin.name
        )));
    }
    if ovens.is_empty() {
        return Err(RegistrationError::precondition(format!(
            "喷房 {} 没有在用烘炉",
            cabin.name
        )));
    }

    let available = piece.stock_available();
    if request.quantity > available {
        return Err(RegistrationError::shortage(
            format!(
                "工件 {} 可用库存不足: 需要 {} 件, 可用 {} 件",
                piece.piece_id, request.quantity, available
            ),
            (request.quantity - available) as f64,
        ));
    }

    let per_piece_kg = request.strategy.consumption_kg_per_piece(
        piece.width_m,
        piece.height_m,
        request.thickness_um,
        request.density_g_cm3,
    );
    let total_kg = request.strategy.consumption_kg_total(
        piece.width_m,
        piece.height_m,
        request.thickness_um,
        request.density_g_cm3,
        request.quantity,
    );
    if total_kg > paint.remaining_kg + PAINT_MASS_EPSILON_KG {
        return Err(RegistrationError::shortage(
            format!(
                "油漆 {} 余量不足: 需要 {:.3} kg, 剩余 {:.3} kg",
                paint.display_name(),
                total_kg,
                paint.remaining_kg
            ),
            total_kg - paint.remaining_kg,
        ));
    }

    Ok((per_piece_kg, total_kg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            piece_id: 1,
            paint_id: 1,
            cabin_id: 1,
            quantity: 10,
            thickness_um: 50.0,
            density_g_cm3: 1.2,
            strategy: ConsumptionStrategy::Standard,
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(request().validate().is_ok());

        let zero = RegistrationRequest {
            quantity: 0,
            ..request()
        };
        assert!(matches!(
            zero.validate(),
            Err(RegistrationError::InvalidInput { ref field, .. }) if field == "quantity"
        ));

        let nan = RegistrationRequest {
            density_g_cm3: f64::NAN,
            ..request()
        };
        assert!(nan.validate().is_err());

        let negative = RegistrationRequest {
            thickness_um: -1.0,
            ..request()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_strategy_defaults_when_omitted() {
        let parsed: RegistrationRequest = serde_json::from_str(
            r#"{"piece_id":1,"paint_id":2,"cabin_id":3,"quantity":4,"thickness_um":50,"density_g_cm3":1.2}"#,
        )
        .unwrap();
        assert_eq!(parsed.strategy, ConsumptionStrategy::Standard);
        assert_eq!(parsed.key().cabin_id, 3);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RegistrationState::Committed.is_terminal());
        assert!(RegistrationState::DuplicateDetected.is_terminal());
        assert!(!RegistrationState::Persisting.is_terminal());
    }
}
