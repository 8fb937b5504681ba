//! Home page, dashboard and the seller's product management.

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use bazaar_core::Role;
use tracing::{instrument, warn};

use super::{flash_redirect, render};
use crate::blob::BlobStore;
use crate::error::MarketError;
use crate::storage::{FlashCategory, ProductInput};
use crate::web::gate::{Authenticated, RequestContext, SellerOnly, Unauthorized};
use crate::web::{AppState, PageError, pages};

/// An uploaded file, before it reaches the blob store.
#[derive(Debug)]
struct Upload {
    filename: String,
    bytes: Bytes,
}

/// The add/edit product multipart form. Missing fields read as empty.
#[derive(Debug, Default)]
struct ProductForm {
    product_name: String,
    description: String,
    price: String,
    image: Option<Upload>,
}

impl ProductForm {
    async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "product_name" => form.product_name = field.text().await?,
                "description" => form.description = field.text().await?,
                "price" => form.price = field.text().await?,
                "image" => {
                    let filename = field.file_name().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await?;
                    form.image = Some(Upload { filename, bytes });
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn input(&self) -> ProductInput<'_> {
        ProductInput {
            name: self.product_name.as_str(),
            description: self.description.as_str(),
            price: self.price.as_str(),
        }
    }

    /// Store the image, if one was chosen, and return its reference.
    async fn store_image(&self, blobs: &dyn BlobStore) -> Result<Option<String>, PageError> {
        match &self.image {
            Some(upload) => Ok(blobs.store(&upload.bytes, &upload.filename).await?),
            None => Ok(None),
        }
    }
}

async fn product_not_found(ctx: &RequestContext) -> Result<Response, PageError> {
    flash_redirect(ctx, FlashCategory::Danger, "Product not found.", "/dashboard").await
}

/// Send the seller back to the form when the upload could not be read.
async fn upload_failed(
    ctx: &RequestContext,
    err: &MultipartError,
    form_url: &str,
) -> Result<Response, PageError> {
    warn!(status = %err.status(), error = %err.body_text(), "Rejected product upload");
    let message = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "Upload too large."
    } else {
        "Upload failed."
    };
    flash_redirect(ctx, FlashCategory::Danger, message, form_url).await
}

/// `GET /`
pub async fn index(ctx: RequestContext) -> Result<Html<String>, PageError> {
    render(&ctx, pages::home).await
}

/// `GET /dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    Authenticated { ctx, identity, .. }: Authenticated,
) -> Result<Html<String>, PageError> {
    let products = match identity.role {
        Role::Seller => state.db.list_products_by_seller(identity.user_id).await?,
        Role::Buyer => Vec::new(),
    };
    render(&ctx, |view| pages::dashboard(view, &identity, &products)).await
}

/// `GET /products`
pub async fn list_products(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Html<String>, PageError> {
    let products = state.db.list_products().await?;
    render(&ctx, |view| pages::products(view, &products)).await
}

/// `GET /add_product`
pub async fn add_product_page(SellerOnly { ctx, .. }: SellerOnly) -> Result<Html<String>, PageError> {
    render(&ctx, |view| pages::product_form(view, None)).await
}

/// `POST /add_product`
#[instrument(skip_all)]
pub async fn add_product(
    State(state): State<AppState>,
    SellerOnly { ctx, identity, .. }: SellerOnly,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let form = match ProductForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return upload_failed(&ctx, &e, "/add_product").await,
    };
    let image = form.store_image(state.blobs.as_ref()).await?;

    state
        .db
        .create_product(identity.user_id, form.input(), image.as_deref())
        .await?;

    flash_redirect(
        &ctx,
        FlashCategory::Success,
        "Product added successfully!",
        "/dashboard",
    )
    .await
}

/// `GET /edit_product/{product_id}`
pub async fn edit_product_page(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    SellerOnly { ctx, identity, .. }: SellerOnly,
) -> Result<Response, PageError> {
    match state
        .db
        .get_product_for_edit(product_id, identity.user_id)
        .await
    {
        Ok(product) => {
            let page = render(&ctx, |view| pages::product_form(view, Some(&product))).await?;
            Ok(page.into_response())
        }
        Err(MarketError::Unauthorized) => product_not_found(&ctx).await,
        Err(e) => Err(e.into()),
    }
}

/// `POST /edit_product/{product_id}`
///
/// Ownership is checked before the upload is stored, so a foreign seller
/// never writes into the blob store.
#[instrument(skip(state, seller, multipart))]
pub async fn edit_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    seller: SellerOnly,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let SellerOnly { ctx, identity, .. } = seller;

    match state
        .db
        .get_product_for_edit(product_id, identity.user_id)
        .await
    {
        Ok(_) => {}
        Err(MarketError::Unauthorized) => return product_not_found(&ctx).await,
        Err(e) => return Err(e.into()),
    }

    let form = match ProductForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => {
            return upload_failed(&ctx, &e, &format!("/edit_product/{product_id}")).await;
        }
    };
    let image = form.store_image(state.blobs.as_ref()).await?;

    match state
        .db
        .update_product(product_id, identity.user_id, form.input(), image.as_deref())
        .await
    {
        Ok(_) => {
            flash_redirect(
                &ctx,
                FlashCategory::Success,
                "Product updated successfully!",
                "/dashboard",
            )
            .await
        }
        // Deleted between the check and the update.
        Err(MarketError::Unauthorized) => product_not_found(&ctx).await,
        Err(e) => Err(e.into()),
    }
}

/// `POST /delete_product/{product_id}`
///
/// Deleting someone else's (or a missing) product is a silent no-op.
#[instrument(skip(state, seller))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    seller: SellerOnly<Unauthorized>,
) -> Result<Response, PageError> {
    let SellerOnly { ctx, identity, .. } = seller;

    match state.db.delete_product(product_id, identity.user_id).await {
        Ok(_) => {
            flash_redirect(
                &ctx,
                FlashCategory::Success,
                "Product deleted successfully.",
                "/dashboard",
            )
            .await
        }
        Err(MarketError::ProductInUse(_)) => {
            flash_redirect(
                &ctx,
                FlashCategory::Danger,
                "Product has orders and cannot be deleted.",
                "/dashboard",
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}
