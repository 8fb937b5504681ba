//! Registration, login and logout.

use axum::Form;
use axum::extract::State;
use axum::response::{Html, Response};
use bazaar_core::Role;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{flash_redirect, render};
use crate::error::MarketError;
use crate::storage::FlashCategory;
use crate::web::gate::RequestContext;
use crate::web::{AppState, PageError, pages};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// `GET /register`
pub async fn register_page(ctx: RequestContext) -> Result<Html<String>, PageError> {
    render(&ctx, pages::register).await
}

/// `POST /register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    let role = match form.role.parse::<Role>().map_err(MarketError::from) {
        Ok(role) => role,
        Err(MarketError::InvalidRole(role)) => {
            warn!(role = %role, "Registration with unknown role");
            return flash_redirect(
                &ctx,
                FlashCategory::Danger,
                "Please choose a valid role.",
                "/register",
            )
            .await;
        }
        Err(e) => return Err(e.into()),
    };

    match state
        .db
        .register(&form.name, &form.email, &form.password, role)
        .await
    {
        Ok(_) => {
            flash_redirect(
                &ctx,
                FlashCategory::Success,
                "Registration successful! Please login.",
                "/login",
            )
            .await
        }
        Err(MarketError::DuplicateEmail) => {
            flash_redirect(
                &ctx,
                FlashCategory::Danger,
                "Email already registered.",
                "/register",
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /login`
pub async fn login_page(ctx: RequestContext) -> Result<Html<String>, PageError> {
    render(&ctx, pages::login).await
}

/// `POST /login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    match state.db.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            ctx.login(&user).await?;
            info!(user_id = user.user_id, role = %user.role, "Logged in");
            flash_redirect(&ctx, FlashCategory::Success, "Login successful!", "/dashboard").await
        }
        Err(MarketError::InvalidCredentials) => {
            flash_redirect(&ctx, FlashCategory::Danger, "Invalid credentials.", "/login").await
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /logout`
pub async fn logout(ctx: RequestContext) -> Result<Response, PageError> {
    ctx.logout().await?;
    flash_redirect(
        &ctx,
        FlashCategory::Success,
        "Logged out successfully.",
        "/login",
    )
    .await
}
