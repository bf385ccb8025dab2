//! 请求身份
//!
//! 认证在上游完成，网关在请求头中转发已验证的用户 ID
//!（默认 `x-user-id`）。这里的提取器只负责读取该请求头
//! 并加载账户行。

use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::database::repository::users_repository::UsersRepository;
use crate::entity::users;
use crate::error::AppError;
use crate::state::AppState;

/// 当前调用者；首次出现时创建账户行
#[derive(Debug, Clone)]
pub struct AuthUser(pub users::Model);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

/// 当前调用者，必须具有 `admin` 角色
#[derive(Debug, Clone)]
pub struct AdminUser(pub users::Model);

impl AdminUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

/// 网关转发的调用者 ID（可能没有）；公开接口用于个性化展示
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<String>);

fn user_id_from(parts: &Parts, header: &str) -> Result<String, AppError> {
    let value = parts
        .headers
        .get(header)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?
        .trim();

    if value.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(value.to_string())
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = user_id_from(parts, &state.config.user_header)?;
        let user = UsersRepository::find_or_create(&state.db, &user_id).await?;
        Ok(AuthUser(user))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = user_id_from(parts, &state.config.user_header)?;
        let user = UsersRepository::find_by_id(&state.db, &user_id)
            .await?
            .ok_or(AppError::Forbidden)?;

        if !user.is_admin() {
            log::warn!("用户 {} 无管理员权限，已拒绝", user.id);
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(user_id_from(parts, &state.config.user_header).ok()))
    }
}
