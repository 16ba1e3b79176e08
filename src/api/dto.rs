// ==========================================
// 喷涂线引擎 - API 请求/响应结构
// ==========================================
// 约定: 成功响应 ok=true；错误响应 { ok:false, kind, message }
// ==========================================

use crate::api::error::ApiError;
use crate::domain::alert::AlertDraft;
use crate::engine::capacity::CabinQuota;
use crate::engine::consumption::ConsumptionStrategy;
use crate::engine::registrar::{RegistrationOutcome, RegistrationRequest};
use serde::{Deserialize, Serialize};

// ==========================================
// 登记请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterBatchRequest {
    pub piece_id: i64,
    pub paint_id: i64,
    pub cabin_id: i64,
    pub quantity: i64,
    pub thickness_um: f64,
    pub density_g_cm3: f64,
    /// "standard" | "highdensity"，缺省 standard
    #[serde(default)]
    pub strategy: Option<String>,
}

impl From<&RegisterBatchRequest> for RegistrationRequest {
    fn from(req: &RegisterBatchRequest) -> Self {
        RegistrationRequest {
            piece_id: req.piece_id,
            paint_id: req.paint_id,
            cabin_id: req.cabin_id,
            quantity: req.quantity,
            thickness_um: req.thickness_um,
            density_g_cm3: req.density_g_cm3,
            strategy: req
                .strategy
                .as_deref()
                .map(ConsumptionStrategy::from_tag)
                .unwrap_or_default(),
        }
    }
}

// ==========================================
// 登记响应
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDto {
    pub equipment_kind: String,
    pub equipment_name: String,
    pub kind: String,
    pub message: String,
    pub severity: String,
}

impl From<&AlertDraft> for AlertDto {
    fn from(draft: &AlertDraft) -> Self {
        Self {
            equipment_kind: draft.equipment_kind.to_db_str().to_string(),
            equipment_name: draft.equipment_name.clone(),
            kind: draft.level.as_str().to_string(),
            message: draft.message.clone(),
            severity: draft.severity.to_db_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredResponse {
    pub ok: bool,
    pub batch_id: i64,
    pub consumption_per_piece_kg: f64,
    pub consumption_total_kg: f64,
    pub remaining_paint_kg: f64,
    pub cabin: CabinQuota,
    pub capacity_warning: Option<String>,
    pub alerts: Vec<AlertDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateResponse {
    pub ok: bool,
    pub duplicate: bool,
    pub batch_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterBatchResponse {
    Registered(RegisteredResponse),
    Duplicate(DuplicateResponse),
}

impl RegisterBatchResponse {
    pub fn batch_id(&self) -> i64 {
        match self {
            RegisterBatchResponse::Registered(r) => r.batch_id,
            RegisterBatchResponse::Duplicate(d) => d.batch_id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, RegisterBatchResponse::Duplicate(_))
    }
}

impl From<RegistrationOutcome> for RegisterBatchResponse {
    fn from(outcome: RegistrationOutcome) -> Self {
        match outcome {
            RegistrationOutcome::Registered(summary) => {
                let summary = *summary;
                RegisterBatchResponse::Registered(RegisteredResponse {
                    ok: true,
                    batch_id: summary.batch_id,
                    consumption_per_piece_kg: summary.consumption_per_piece_kg,
                    consumption_total_kg: summary.consumption_total_kg,
                    remaining_paint_kg: summary.remaining_paint_kg,
                    alerts: summary.alerts.iter().map(AlertDto::from).collect(),
                    capacity_warning: summary.capacity_warning,
                    cabin: summary.cabin,
                })
            }
            RegistrationOutcome::Duplicate { batch_id, .. } => {
                RegisterBatchResponse::Duplicate(DuplicateResponse {
                    ok: true,
                    duplicate: true,
                    batch_id,
                    message: format!("重复提交，批次 {} 已处理", batch_id),
                })
            }
        }
    }
}

// ==========================================
// 告警已读响应
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAlertReadResponse {
    pub ok: bool,
    pub alert_id: i64,
    /// false 表示原本已读
    pub changed: bool,
}

// ==========================================
// 错误响应
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<f64>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            ok: false,
            kind: err.kind().to_string(),
            message: err.to_string(),
            shortfall: match err {
                ApiError::PreconditionFailed { shortfall, .. } => *shortfall,
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;

    #[test]
    fn test_duplicate_response_shape() {
        let outcome = RegistrationOutcome::Duplicate {
            batch_id: 42,
            registered_at: NaiveDate::from_ymd_opt(2026, 3, 10)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        };
        let json: Value = serde_json::to_value(RegisterBatchResponse::from(outcome)).unwrap();
        assert_eq!(json["ok"], Value::Bool(true));
        assert_eq!(json["duplicate"], Value::Bool(true));
        assert_eq!(json["batch_id"], 42);
        assert!(json["message"].is_string());
    }

    #[test]
    fn test_error_response_shape() {
        let err = ApiError::PreconditionFailed {
            reason: "油漆余量不足".to_string(),
            shortfall: Some(0.25),
        };
        let json: Value = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["ok"], Value::Bool(false));
        assert_eq!(json["kind"], "PRECONDITION_FAILED");
        assert_eq!(json["shortfall"], 0.25);

        let json: Value =
            serde_json::to_value(ErrorResponse::from(&ApiError::Unauthorized("x".into()))).unwrap();
        assert!(json.get("shortfall").is_none());
    }

    #[test]
    fn test_strategy_tag_mapping() {
        let req: RegisterBatchRequest = serde_json::from_str(
            r#"{"piece_id":1,"paint_id":1,"cabin_id":1,"quantity":2,
                "thickness_um":50,"density_g_cm3":1.2,"strategy":"HIGH_DENSITY"}"#,
        )
        .unwrap();
        assert_eq!(
            RegistrationRequest::from(&req).strategy,
            ConsumptionStrategy::HighDensity
        );

        let req = RegisterBatchRequest {
            strategy: None,
            ..req
        };
        assert_eq!(
            RegistrationRequest::from(&req).strategy,
            ConsumptionStrategy::Standard
        );
    }
}
