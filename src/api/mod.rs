// ==========================================
// 喷涂线引擎 - API 层
// ==========================================
// 职责: 面向 UI/命令行的业务接口，鉴权 + 错误分类 + 响应结构
// ==========================================

pub mod auth;
pub mod dto;
pub mod error;
pub mod production_api;

pub use auth::{Permission, PermissionAuthorizer, SessionAuthorizer, SessionContext};
pub use dto::{
    AlertDto, DuplicateResponse, ErrorResponse, MarkAlertReadResponse, RegisterBatchRequest,
    RegisterBatchResponse, RegisteredResponse,
};
pub use error::{ApiError, ApiResult};
pub use production_api::ProductionApi;
