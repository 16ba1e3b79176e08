// ==========================================
// 喷涂线引擎 - 生产登记 API
// ==========================================
// 职责: 鉴权 → 调用登记引擎/仓储 → 组装响应
// 红线: 鉴权先于任何读写
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::api::auth::{Permission, SessionAuthorizer, SessionContext};
use crate::api::dto::{MarkAlertReadResponse, RegisterBatchRequest, RegisterBatchResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::alert::Alert;
use crate::domain::batch::UsageEvent;
use crate::domain::cabin::{EquipmentSnapshot, WearMonitor};
use crate::engine::alert::{AlertEvaluator, MaintenanceRow};
use crate::engine::capacity::CabinQuota;
use crate::engine::registrar::{BatchRegistrar, RegistrationRequest};
use crate::perf::PerfGuard;
use crate::repository::{
    ActionLogRepository, AlertRepository, EquipmentRepository, UsageEventRepository,
};

/// 未读告警单次查询上限
pub const MAX_ALERT_PAGE: i64 = 500;

// ==========================================
// ProductionApi - 生产登记 API
// ==========================================
pub struct ProductionApi {
    registrar: Arc<BatchRegistrar>,
    equipment_repo: Arc<EquipmentRepository>,
    alert_repo: Arc<AlertRepository>,
    usage_repo: Arc<UsageEventRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    evaluator: AlertEvaluator,
    authorizer: Arc<dyn SessionAuthorizer>,
}

impl ProductionApi {
    pub fn new(
        registrar: Arc<BatchRegistrar>,
        equipment_repo: Arc<EquipmentRepository>,
        alert_repo: Arc<AlertRepository>,
        usage_repo: Arc<UsageEventRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        authorizer: Arc<dyn SessionAuthorizer>,
    ) -> Self {
        let evaluator = AlertEvaluator::new(registrar.config().thresholds);
        Self {
            registrar,
            equipment_repo,
            alert_repo,
            usage_repo,
            action_log_repo,
            evaluator,
            authorizer,
        }
    }

    // ==========================================
    // 批次登记
    // ==========================================

    /// 登记喷涂批次
    ///
    /// # 返回
    /// - Ok(Registered): 登记成功（可能带产能超额提示与设备告警）
    /// - Ok(Duplicate): 时间窗内重复提交
    /// - Err(ApiError): UNAUTHORIZED / NOT_FOUND / PRECONDITION_FAILED / INVALID_INPUT / TRANSACTION_FAILURE
    pub fn register_batch(
        &self,
        session: Option<&SessionContext>,
        request: &RegisterBatchRequest,
    ) -> ApiResult<RegisterBatchResponse> {
        self.register_batch_at(session, request, Local::now().naive_local())
    }

    /// 以指定时间登记
    pub fn register_batch_at(
        &self,
        session: Option<&SessionContext>,
        request: &RegisterBatchRequest,
        now: NaiveDateTime,
    ) -> ApiResult<RegisterBatchResponse> {
        let actor = self
            .authorizer
            .authorize(session, Permission::ProductionRegister)?;
        let _perf = PerfGuard::new("api.register_batch");

        let outcome = self
            .registrar
            .register_at(&RegistrationRequest::from(request), &actor, now)?;
        Ok(RegisterBatchResponse::from(outcome))
    }

    // ==========================================
    // 告警收件箱
    // ==========================================

    /// 查询未读告警（最新在前）
    pub fn list_unread_alerts(
        &self,
        session: Option<&SessionContext>,
        limit: i64,
    ) -> ApiResult<Vec<Alert>> {
        self.authorizer.authorize(session, Permission::AlertsManage)?;
        if limit <= 0 || limit > MAX_ALERT_PAGE {
            return Err(ApiError::InvalidInput(format!(
                "limit 必须在 1..={} 之间，实际 {}",
                MAX_ALERT_PAGE, limit
            )));
        }
        let _perf = PerfGuard::new("api.list_unread_alerts");
        Ok(self.alert_repo.list_unread(limit)?)
    }

    /// 标记告警已读（状态变化时记录操作日志）
    pub fn mark_alert_read(
        &self,
        session: Option<&SessionContext>,
        alert_id: i64,
    ) -> ApiResult<MarkAlertReadResponse> {
        let actor = self.authorizer.authorize(session, Permission::AlertsManage)?;
        let _perf = PerfGuard::new("api.mark_alert_read");

        let changed = self.alert_repo.mark_read(alert_id)?;
        if changed {
            let log = ActionLog::new(ActionType::MarkAlertRead, &actor, Local::now().naive_local())
                .with_entity("equipment_alert", alert_id)
                .with_detail(format!("告警 {} 标记已读", alert_id));
            if let Err(e) = self.action_log_repo.insert(&log) {
                // 告警状态已更新，审计写入失败只记录
                tracing::warn!(alert_id, error = %e, "告警已读审计记录写入失败");
            }
        }

        Ok(MarkAlertReadResponse {
            ok: true,
            alert_id,
            changed,
        })
    }

    // ==========================================
    // 维护与喷房状态
    // ==========================================

    /// 维护报表：全部喷枪/烘炉的磨损分级
    pub fn maintenance_report(
        &self,
        session: Option<&SessionContext>,
    ) -> ApiResult<Vec<MaintenanceRow>> {
        self.authorizer
            .authorize(session, Permission::MaintenanceView)?;
        let _perf = PerfGuard::new("api.maintenance_report");

        let snapshots: Vec<EquipmentSnapshot> = self
            .equipment_repo
            .list_all_guns()?
            .iter()
            .map(|g| g.snapshot())
            .chain(
                self.equipment_repo
                    .list_all_ovens()?
                    .iter()
                    .map(|o| o.snapshot()),
            )
            .collect();
        Ok(self.evaluator.maintenance_report(&snapshots))
    }

    /// 喷房当日状态（不登记任何数据）
    pub fn cabin_status(
        &self,
        session: Option<&SessionContext>,
        cabin_id: i64,
        today: NaiveDate,
    ) -> ApiResult<CabinQuota> {
        self.authorizer
            .authorize(session, Permission::MaintenanceView)?;

        let cabin = self.equipment_repo.get_cabin(cabin_id)?;
        let guns = self.equipment_repo.list_active_guns(cabin_id)?;
        let ovens = self.equipment_repo.list_active_ovens(cabin_id)?;
        Ok(CabinQuota::for_day(&cabin, today, &guns, &ovens))
    }

    /// 喷房某日的用量事件
    pub fn usage_history(
        &self,
        session: Option<&SessionContext>,
        cabin_id: i64,
        date: NaiveDate,
    ) -> ApiResult<Vec<UsageEvent>> {
        self.authorizer
            .authorize(session, Permission::MaintenanceView)?;
        // 喷房不存在时返回 NOT_FOUND，而不是空列表
        self.equipment_repo.get_cabin(cabin_id)?;
        Ok(self.usage_repo.list_by_cabin_and_date(cabin_id, date)?)
    }
}
