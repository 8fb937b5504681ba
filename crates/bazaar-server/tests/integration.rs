#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use bazaar_core::{OrderStatus, Role};
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

use bazaar_server::blob::FsBlobStore;
use bazaar_server::notifications::{LogNotifier, NotificationError, Notifier};
use bazaar_server::storage::{MarketDatabase, ProductInput};
use bazaar_server::web::{AppState, SESSION_COOKIE, build_router};

const BOUNDARY: &str = "bazaar-test-boundary";

struct TestApp {
    router: axum::Router,
    db: MarketDatabase,
    upload_dir: TempDir,
}

async fn test_app_with(notifier: Arc<dyn Notifier>) -> TestApp {
    build_test_app(notifier, 1024 * 1024).await
}

async fn build_test_app(notifier: Arc<dyn Notifier>, max_body_bytes: usize) -> TestApp {
    let db = MarketDatabase::open_in_memory().await.unwrap();
    let upload_dir = tempfile::tempdir().unwrap();
    let router = build_router(AppState {
        db: db.clone(),
        blobs: Arc::new(FsBlobStore::new(upload_dir.path())),
        notifier,
        upload_dir: upload_dir.path().to_path_buf(),
        session_ttl_secs: 3600,
        max_body_bytes,
    });
    TestApp {
        router,
        db,
        upload_dir,
    }
}

async fn test_app() -> TestApp {
    test_app_with(Arc::new(LogNotifier::new("noreply@onlinestore.com"))).await
}

async fn session_count(app: &TestApp) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(app.db.pool())
        .await
        .unwrap()
}

/// What a response looked like, with the body read out.
struct Reply {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

impl Reply {
    fn assert_redirect(&self, to: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        assert_eq!(self.location.as_deref(), Some(to));
    }
}

/// A browser stand-in that keeps the session cookie between requests.
struct Client {
    router: axum::Router,
    cookie: Option<String>,
}

impl Client {
    fn new(app: &TestApp) -> Self {
        Self {
            router: app.router.clone(),
            cookie: None,
        }
    }

    async fn send(&mut self, mut builder: axum::http::request::Builder, body: Body) -> Reply {
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={cookie}"));
        }
        let resp: Response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set) = resp.headers().get(header::SET_COOKIE) {
            let pair = set.to_str().unwrap().split(';').next().unwrap();
            let value = pair
                .strip_prefix(&format!("{SESSION_COOKIE}="))
                .expect("session cookie");
            self.cookie = Some(value.to_string());
        }

        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        Reply {
            status,
            location,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    async fn get(&mut self, uri: &str) -> Reply {
        self.send(Request::builder().uri(uri), Body::empty()).await
    }

    async fn post_form(&mut self, uri: &str, form: &str) -> Reply {
        let builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(form.to_string())).await
    }

    async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Reply {
        let builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        self.send(builder, Body::from(multipart_body(fields, file)))
            .await
    }

    async fn register(&mut self, name: &str, email: &str, password: &str, role: &str) -> Reply {
        self.post_form(
            "/register",
            &format!("name={name}&email={email}&password={password}&role={role}"),
        )
        .await
    }

    async fn login(&mut self, email: &str, password: &str) -> Reply {
        self.post_form("/login", &format!("email={email}&password={password}"))
            .await
    }
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Register through the store and log in over HTTP.
async fn logged_in(app: &TestApp, name: &str, role: Role) -> (Client, i64) {
    let email = format!("{name}@shop.test");
    let user = app.db.register(name, &email, "pw", role).await.unwrap();
    let mut client = Client::new(app);
    client.login(&email, "pw").await.assert_redirect("/dashboard");
    (client, user.user_id)
}

fn lamp() -> ProductInput<'static> {
    ProductInput {
        name: "Lamp",
        description: "Brass desk lamp",
        price: "19.99",
    }
}

#[tokio::test]
async fn health_is_ok_without_session() {
    let app = test_app().await;
    let resp = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn anonymous_browsing_writes_no_session() {
    let app = test_app().await;

    for uri in ["/", "/products", "/login", "/no/such/page"] {
        let resp = app
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.headers().get(header::SET_COOKIE).is_none(), "{uri}");
    }

    assert_eq!(session_count(&app).await, 0);
}

#[tokio::test]
async fn first_flash_sets_session_cookie() {
    let app = test_app().await;
    let resp = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("bazaar_session="));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(session_count(&app).await, 1);
}

#[tokio::test]
async fn end_to_end_seller_lists_buyer_orders() {
    let app = test_app().await;

    let mut seller = Client::new(&app);
    seller
        .register("Sam", "sam@shop.test", "pw", "seller")
        .await
        .assert_redirect("/login");
    let page = seller.get("/login").await;
    assert!(page.body.contains("Registration successful! Please login."));

    seller
        .login("sam@shop.test", "pw")
        .await
        .assert_redirect("/dashboard");
    let page = seller.get("/dashboard").await;
    assert!(page.body.contains("Login successful!"));
    assert!(page.body.contains("/add_product"));

    seller
        .post_multipart(
            "/add_product",
            &[
                ("product_name", "Lamp"),
                ("description", "Brass desk lamp"),
                ("price", "9.99"),
            ],
            Some(("lamp.png", &b"PNGDATA"[..])),
        )
        .await
        .assert_redirect("/dashboard");
    let page = seller.get("/dashboard").await;
    assert!(page.body.contains("Product added successfully!"));
    assert!(page.body.contains("Lamp"));
    assert!(page.body.contains("/uploads/lamp.png"));

    let image = seller.get("/uploads/lamp.png").await;
    assert_eq!(image.status, StatusCode::OK);
    assert_eq!(image.body, "PNGDATA");
    assert!(app.upload_dir.path().join("lamp.png").exists());

    let product_id = app.db.list_products().await.unwrap()[0].product_id;

    let mut buyer = Client::new(&app);
    buyer
        .register("Bea", "bea@shop.test", "pw", "buyer")
        .await
        .assert_redirect("/login");
    buyer
        .login("bea@shop.test", "pw")
        .await
        .assert_redirect("/dashboard");

    let page = buyer.get("/products").await;
    assert!(page.body.contains(&format!("/place_order/{product_id}")));

    buyer
        .post_form(&format!("/place_order/{product_id}"), "")
        .await
        .assert_redirect("/products");
    let page = buyer.get("/products").await;
    assert!(page.body.contains("Order placed successfully!"));

    let page = buyer.get("/orders").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Lamp"));
    assert!(page.body.contains("Sam"));
    assert!(page.body.contains("Pending"));

    let page = seller.get("/orders").await;
    assert!(page.body.contains("Bea"));
    assert!(page.body.contains("Pending"));
}

#[tokio::test]
async fn register_rejects_duplicates_and_unknown_roles() {
    let app = test_app().await;
    let mut client = Client::new(&app);

    client
        .register("Ann", "ann@shop.test", "pw", "buyer")
        .await
        .assert_redirect("/login");
    client
        .register("Other", "ann@shop.test", "different", "seller")
        .await
        .assert_redirect("/register");
    let page = client.get("/register").await;
    assert!(page.body.contains("Email already registered."));

    client
        .register("Root", "root@shop.test", "pw", "admin")
        .await
        .assert_redirect("/register");
    let page = client.get("/register").await;
    assert!(page.body.contains("Please choose a valid role."));

    client
        .register("Blank", "blank@shop.test", "pw", "")
        .await
        .assert_redirect("/register");
    assert!(app.db.authenticate("blank@shop.test", "pw").await.is_err());
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = test_app().await;
    app.db
        .register("Ann", "ann@shop.test", "Secret", Role::Buyer)
        .await
        .unwrap();

    let mut client = Client::new(&app);
    client
        .login("ann@shop.test", "secret")
        .await
        .assert_redirect("/login");
    let page = client.get("/login").await;
    assert!(page.body.contains("Invalid credentials."));

    client.get("/dashboard").await.assert_redirect("/login");
}

#[tokio::test]
async fn gate_redirects_by_route_class() {
    let app = test_app().await;

    let mut anon = Client::new(&app);
    anon.get("/dashboard").await.assert_redirect("/login");
    assert!(anon.get("/login").await.body.contains("Please login first."));
    anon.get("/orders").await.assert_redirect("/login");
    assert!(anon.get("/login").await.body.contains("Login required."));
    anon.get("/add_product").await.assert_redirect("/dashboard");
    anon.post_form("/place_order/1", "")
        .await
        .assert_redirect("/login");

    let (mut buyer, _) = logged_in(&app, "bea", Role::Buyer).await;
    buyer.get("/add_product").await.assert_redirect("/dashboard");
    assert!(buyer
        .get("/dashboard")
        .await
        .body
        .contains("Unauthorized access."));
    buyer
        .post_form("/delete_product/1", "")
        .await
        .assert_redirect("/dashboard");
    let page = buyer.get("/dashboard").await;
    assert!(page.body.contains("Unauthorized."));
    assert!(!page.body.contains("Unauthorized access."));

    let (mut seller, _) = logged_in(&app, "sam", Role::Seller).await;
    seller
        .post_form("/place_order/1", "")
        .await
        .assert_redirect("/login");
    assert!(seller
        .get("/login")
        .await
        .body
        .contains("Login as buyer to order."));
}

#[tokio::test]
async fn foreign_seller_cannot_edit_or_delete() {
    let app = test_app().await;
    let owner = app
        .db
        .register("Owner", "owner@shop.test", "pw", Role::Seller)
        .await
        .unwrap();
    let product = app
        .db
        .create_product(owner.user_id, lamp(), Some("uploads/lamp.png"))
        .await
        .unwrap();
    let id = product.product_id;

    let (mut other, _) = logged_in(&app, "intruder", Role::Seller).await;

    other
        .get(&format!("/edit_product/{id}"))
        .await
        .assert_redirect("/dashboard");
    assert!(other
        .get("/dashboard")
        .await
        .body
        .contains("Product not found."));

    other
        .post_multipart(
            &format!("/edit_product/{id}"),
            &[("product_name", "Hijacked"), ("description", ""), ("price", "0")],
            Some(("evil.png", &b"EVIL"[..])),
        )
        .await
        .assert_redirect("/dashboard");
    assert!(!app.upload_dir.path().join("evil.png").exists());

    other
        .post_form(&format!("/delete_product/{id}"), "")
        .await
        .assert_redirect("/dashboard");

    assert_eq!(app.db.get_product(id).await.unwrap(), product);
}

#[tokio::test]
async fn owner_edit_without_new_image_keeps_it() {
    let app = test_app().await;
    let (mut seller, seller_id) = logged_in(&app, "sam", Role::Seller).await;
    let product = app
        .db
        .create_product(seller_id, lamp(), Some("uploads/lamp.png"))
        .await
        .unwrap();
    let id = product.product_id;

    let page = seller.get(&format!("/edit_product/{id}")).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Brass desk lamp"));

    // An empty file input arrives as a part with an empty filename.
    seller
        .post_multipart(
            &format!("/edit_product/{id}"),
            &[
                ("product_name", "Lamp v2"),
                ("description", ""),
                ("price", "25.00"),
            ],
            Some(("", &b""[..])),
        )
        .await
        .assert_redirect("/dashboard");

    let updated = app.db.get_product(id).await.unwrap();
    assert_eq!(updated.product_name, "Lamp v2");
    assert_eq!(updated.description, "");
    assert_eq!(updated.price, "25.00");
    assert_eq!(updated.image.as_deref(), Some("uploads/lamp.png"));
}

#[tokio::test]
async fn owner_delete_and_delete_of_ordered_product() {
    let app = test_app().await;
    let (mut seller, seller_id) = logged_in(&app, "sam", Role::Seller).await;
    let buyer = app
        .db
        .register("Bea", "bea@shop.test", "pw", Role::Buyer)
        .await
        .unwrap();

    let unsold = app.db.create_product(seller_id, lamp(), None).await.unwrap();
    let sold = app.db.create_product(seller_id, lamp(), None).await.unwrap();
    app.db
        .place_order(buyer.user_id, sold.product_id)
        .await
        .unwrap();

    seller
        .post_form(&format!("/delete_product/{}", unsold.product_id), "")
        .await
        .assert_redirect("/dashboard");
    assert!(seller
        .get("/dashboard")
        .await
        .body
        .contains("Product deleted successfully."));
    assert!(app.db.get_product(unsold.product_id).await.is_err());

    seller
        .post_form(&format!("/delete_product/{}", sold.product_id), "")
        .await
        .assert_redirect("/dashboard");
    assert!(seller
        .get("/dashboard")
        .await
        .body
        .contains("Product has orders and cannot be deleted."));
    assert!(app.db.get_product(sold.product_id).await.is_ok());
}

#[tokio::test]
async fn ordering_missing_product_flashes_not_found() {
    let app = test_app().await;
    let (mut buyer, buyer_id) = logged_in(&app, "bea", Role::Buyer).await;

    buyer
        .post_form("/place_order/999", "")
        .await
        .assert_redirect("/products");
    assert!(buyer
        .get("/products")
        .await
        .body
        .contains("Product not found."));
    assert!(app
        .db
        .list_orders_for_user(buyer_id, Role::Buyer)
        .await
        .unwrap()
        .is_empty());
}

struct FailingNotifier {
    called: Notify,
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify_seller(&self, _: &str, _: &str, _: &str) -> Result<(), NotificationError> {
        self.called.notify_one();
        Err(NotificationError::Request("mail server down".into()))
    }
}

#[tokio::test]
async fn order_persists_when_notifier_fails() {
    let notifier = Arc::new(FailingNotifier {
        called: Notify::new(),
    });
    let app = test_app_with(notifier.clone()).await;

    let seller = app
        .db
        .register("Sam", "sam@shop.test", "pw", Role::Seller)
        .await
        .unwrap();
    let product = app.db.create_product(seller.user_id, lamp(), None).await.unwrap();
    let (mut buyer, buyer_id) = logged_in(&app, "bea", Role::Buyer).await;

    buyer
        .post_form(&format!("/place_order/{}", product.product_id), "")
        .await
        .assert_redirect("/products");

    tokio::time::timeout(Duration::from_secs(5), notifier.called.notified())
        .await
        .expect("notifier was not called");

    let orders = app
        .db
        .list_orders_for_user(buyer_id, Role::Buyer)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert!(orders[0].order_date > 0);

    assert!(buyer
        .get("/products")
        .await
        .body
        .contains("Order placed successfully!"));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = test_app().await;
    let (mut client, _) = logged_in(&app, "sam", Role::Seller).await;
    assert_eq!(client.get("/dashboard").await.status, StatusCode::OK);

    client.get("/logout").await.assert_redirect("/login");
    assert!(client
        .get("/login")
        .await
        .body
        .contains("Logged out successfully."));
    client.get("/dashboard").await.assert_redirect("/login");
}

#[tokio::test]
async fn stale_cookie_is_replaced_on_first_flash() {
    let app = test_app().await;
    let mut client = Client::new(&app);
    client.cookie = Some("not-a-real-token".to_string());

    let page = client.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(client.cookie.as_deref(), Some("not-a-real-token"));
    assert_eq!(session_count(&app).await, 0);

    client.get("/dashboard").await.assert_redirect("/login");
    assert_ne!(client.cookie.as_deref(), Some("not-a-real-token"));
    assert!(client.get("/login").await.body.contains("Please login first."));
}

#[tokio::test]
async fn oversized_upload_redirects_back_to_form() {
    let app = build_test_app(
        Arc::new(LogNotifier::new("noreply@onlinestore.com")),
        1024,
    )
    .await;
    let (mut seller, seller_id) = logged_in(&app, "sam", Role::Seller).await;
    let big = vec![b'x'; 4096];
    let fields = [
        ("product_name", "Lamp"),
        ("description", "Brass desk lamp"),
        ("price", "9.99"),
    ];

    seller
        .post_multipart("/add_product", &fields, Some(("big.png", &big[..])))
        .await
        .assert_redirect("/add_product");
    assert!(seller
        .get("/add_product")
        .await
        .body
        .contains("Upload too large."));
    assert!(app.db.list_products().await.unwrap().is_empty());
    assert!(!app.upload_dir.path().join("big.png").exists());

    let product = app.db.create_product(seller_id, lamp(), None).await.unwrap();
    let id = product.product_id;
    seller
        .post_multipart(
            &format!("/edit_product/{id}"),
            &fields,
            Some(("big.png", &big[..])),
        )
        .await
        .assert_redirect(&format!("/edit_product/{id}"));
    assert!(seller
        .get(&format!("/edit_product/{id}"))
        .await
        .body
        .contains("Upload too large."));
    assert_eq!(app.db.get_product(id).await.unwrap(), product);
}
