//! Session and authorization gate.
//!
//! [`session_middleware`] resolves the `bazaar_session` cookie into a
//! [`RequestContext`] stored in request extensions. Handlers then pick the
//! route class they need through an extractor:
//!
//! - [`Authenticated`]: any logged-in user, else `/login`
//! - [`SellerOnly`]: role seller, else `/dashboard`
//! - [`BuyerOnly`]: role buyer, else `/login`
//!
//! Rejections are redirects carrying a flash message, never error pages.
//! The first two take a [`Denial`] parameter choosing that message.

use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use bazaar_core::Role;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{AppState, PageError};
use crate::auth::token;
use crate::storage::{DatabaseError, Flash, FlashCategory, MarketDatabase, SessionRecord, User};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "bazaar_session";

/// The logged-in user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub name: String,
    pub role: Role,
}

impl Identity {
    fn from_record(record: SessionRecord) -> Option<Self> {
        match (record.user_id, record.user_name, record.role) {
            (Some(user_id), Some(name), Some(role)) => Some(Self {
                user_id,
                name,
                role,
            }),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct SessionSlot {
    token_hash: String,
    /// Raw token to hand back in `Set-Cookie`, when one was minted during
    /// this request.
    issued: Option<String>,
    /// Whether a `sessions` row exists for `token_hash`. Visitors who never
    /// log in or receive a flash never get one.
    persisted: bool,
}

impl SessionSlot {
    fn fresh() -> Self {
        let (raw, token_hash) = new_token();
        Self {
            token_hash,
            issued: Some(raw),
            persisted: false,
        }
    }
}

/// Per-request view of the caller's session.
#[derive(Clone)]
pub struct RequestContext {
    db: MarketDatabase,
    ttl_secs: i64,
    identity: Option<Identity>,
    session: Arc<Mutex<SessionSlot>>,
}

impl RequestContext {
    /// Resolve a raw session token. A missing, unknown or expired token
    /// yields an anonymous context whose session is only written on first
    /// use.
    pub async fn load(
        db: MarketDatabase,
        ttl_secs: i64,
        raw_token: Option<&str>,
    ) -> Result<Self, DatabaseError> {
        if let Some(raw) = raw_token {
            let token_hash = token::hash_token(raw);
            if let Some(record) = db.get_session(&token_hash).await? {
                return Ok(Self {
                    db,
                    ttl_secs,
                    identity: Identity::from_record(record),
                    session: Arc::new(Mutex::new(SessionSlot {
                        token_hash,
                        issued: None,
                        persisted: true,
                    })),
                });
            }
        }

        Ok(Self {
            db,
            ttl_secs,
            identity: None,
            session: Arc::new(Mutex::new(SessionSlot::fresh())),
        })
    }

    /// Identity as of the start of the request.
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Queue a message for the next rendered page.
    pub async fn flash(
        &self,
        category: FlashCategory,
        message: &str,
    ) -> Result<(), DatabaseError> {
        let mut slot = self.session.lock().await;
        if !slot.persisted {
            self.db
                .create_session(&slot.token_hash, None, self.ttl_secs)
                .await?;
            slot.persisted = true;
            debug!("Anonymous session started");
        }
        self.db
            .push_flash(&slot.token_hash, &Flash::new(category, message))
            .await
    }

    /// Drain the queued messages.
    pub async fn take_flashes(&self) -> Result<Vec<Flash>, DatabaseError> {
        let slot = self.session.lock().await;
        if !slot.persisted {
            return Ok(Vec::new());
        }
        self.db.take_flashes(&slot.token_hash).await
    }

    /// Bind the session to `user`. The token is rotated.
    pub async fn login(&self, user: &User) -> Result<(), DatabaseError> {
        self.replace_session(Some(user.user_id)).await
    }

    /// Drop the session and continue with a fresh anonymous one.
    pub async fn logout(&self) -> Result<(), DatabaseError> {
        self.replace_session(None).await
    }

    async fn replace_session(&self, user_id: Option<i64>) -> Result<(), DatabaseError> {
        let mut slot = self.session.lock().await;
        if slot.persisted {
            self.db.delete_session(&slot.token_hash).await?;
        }

        let mut next = SessionSlot::fresh();
        self.db
            .create_session(&next.token_hash, user_id, self.ttl_secs)
            .await?;
        next.persisted = true;

        *slot = next;
        Ok(())
    }

    /// `Set-Cookie` value for a token minted and persisted during this
    /// request.
    async fn issued_cookie(&self) -> Option<HeaderValue> {
        let slot = self.session.lock().await;
        if !slot.persisted {
            return None;
        }
        let raw = slot.issued.as_deref()?;
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={raw}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.ttl_secs
        ))
        .ok()
    }
}

fn new_token() -> (String, String) {
    let raw = token::generate_token();
    let hash = token::hash_token(&raw);
    (raw, hash)
}

/// Find a cookie by name across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

/// Attach a [`RequestContext`] to the request and emit the session cookie
/// when a new token was issued.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, PageError> {
    let raw_token = cookie_value(req.headers(), SESSION_COOKIE).map(str::to_owned);
    let ctx =
        RequestContext::load(state.db.clone(), state.session_ttl_secs, raw_token.as_deref())
            .await?;
    req.extensions_mut().insert(ctx.clone());

    let mut response = next.run(req).await;

    if let Some(cookie) = ctx.issued_cookie().await {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(response)
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| PageError::Internal("session middleware not installed".into()))
    }
}

/// Flash a message and redirect. A failed flash still redirects.
async fn reject(ctx: &RequestContext, category: FlashCategory, message: &str, to: &str) -> Response {
    if let Err(e) = ctx.flash(category, message).await {
        warn!(error = %e, "Failed to store flash message");
    }
    Redirect::to(to).into_response()
}

/// Message flashed when a route guard turns a request away.
pub trait Denial: Send + Sync + 'static {
    const MESSAGE: &'static str;
}

/// "Please login first."
pub struct LoginFirst;

/// "Login required."
pub struct LoginRequired;

/// "Unauthorized access."
pub struct UnauthorizedAccess;

/// "Unauthorized."
pub struct Unauthorized;

impl Denial for LoginFirst {
    const MESSAGE: &'static str = "Please login first.";
}

impl Denial for LoginRequired {
    const MESSAGE: &'static str = "Login required.";
}

impl Denial for UnauthorizedAccess {
    const MESSAGE: &'static str = "Unauthorized access.";
}

impl Denial for Unauthorized {
    const MESSAGE: &'static str = "Unauthorized.";
}

/// Any logged-in user. Anonymous callers go to `/login` with a warning.
pub struct Authenticated<D: Denial = LoginFirst> {
    pub ctx: RequestContext,
    pub identity: Identity,
    denial: PhantomData<D>,
}

impl<S: Send + Sync, D: Denial> FromRequestParts<S> for Authenticated<D> {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let Some(identity) = ctx.identity().cloned() else {
            return Err(reject(&ctx, FlashCategory::Warning, D::MESSAGE, "/login").await);
        };
        Ok(Self {
            ctx,
            identity,
            denial: PhantomData,
        })
    }
}

/// A logged-in seller. Anyone else goes to `/dashboard` with a danger flash.
pub struct SellerOnly<D: Denial = UnauthorizedAccess> {
    pub ctx: RequestContext,
    pub identity: Identity,
    denial: PhantomData<D>,
}

impl<S: Send + Sync, D: Denial> FromRequestParts<S> for SellerOnly<D> {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match ctx.identity().cloned() {
            Some(identity) => match identity.role {
                Role::Seller => Ok(Self {
                    ctx,
                    identity,
                    denial: PhantomData,
                }),
                Role::Buyer => Err(seller_rejection::<D>(&ctx).await),
            },
            None => Err(seller_rejection::<D>(&ctx).await),
        }
    }
}

async fn seller_rejection<D: Denial>(ctx: &RequestContext) -> Response {
    reject(ctx, FlashCategory::Danger, D::MESSAGE, "/dashboard").await
}

/// A logged-in buyer.
pub struct BuyerOnly {
    pub ctx: RequestContext,
    pub identity: Identity,
}

impl<S: Send + Sync> FromRequestParts<S> for BuyerOnly {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match ctx.identity().cloned() {
            Some(identity) => match identity.role {
                Role::Buyer => Ok(Self { ctx, identity }),
                Role::Seller => Err(buyer_rejection(&ctx).await),
            },
            None => Err(buyer_rejection(&ctx).await),
        }
    }
}

async fn buyer_rejection(ctx: &RequestContext) -> Response {
    reject(ctx, FlashCategory::Warning, "Login as buyer to order.", "/login").await
}
