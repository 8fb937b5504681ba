//! Server-rendered HTML pages.

use std::fmt::Write;

use bazaar_core::Role;

use super::gate::Identity;
use crate::storage::{Flash, OrderView, Product};

/// What every page shows around its body: the navigation for the current
/// identity and any pending flash messages.
pub struct View<'a> {
    pub identity: Option<&'a Identity>,
    pub flashes: &'a [Flash],
}

/// Escape text for HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a stored Unix timestamp as UTC.
pub fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0).map_or_else(
        || ts.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn nav(identity: Option<&Identity>) -> String {
    match identity {
        Some(who) => format!(
            r#"<a href="/">Home</a> <a href="/products">Products</a> <a href="/dashboard">Dashboard</a> <a href="/orders">Orders</a> <span class="who">{name} ({role})</span> <a href="/logout">Logout</a>"#,
            name = escape(&who.name),
            role = who.role,
        ),
        None => r#"<a href="/">Home</a> <a href="/products">Products</a> <a href="/login">Login</a> <a href="/register">Register</a>"#
            .to_string(),
    }
}

fn flash_list(flashes: &[Flash]) -> String {
    let mut out = String::new();
    for flash in flashes {
        let _ = write!(
            out,
            r#"<div class="flash {category}">{message}</div>"#,
            category = flash.category.as_str(),
            message = escape(&flash.message),
        );
    }
    out
}

fn layout(title: &str, view: &View<'_>, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Bazaar</title>
<style>
  body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
         max-width: 900px; margin: 0 auto; padding: 1rem; line-height: 1.5; }}
  nav a {{ margin-right: 0.75rem; }}
  .who {{ color: #666; margin-right: 0.75rem; }}
  .flash {{ padding: 0.5rem 1rem; margin: 0.5rem 0; border-radius: 4px; }}
  .success {{ background: #e6f4ea; }}
  .danger {{ background: #fce8e6; }}
  .warning {{ background: #fef7e0; }}
  table {{ width: 100%; border-collapse: collapse; }}
  th, td {{ padding: 0.4rem; border-bottom: 1px solid #ddd; text-align: left; }}
  img.thumb {{ max-width: 80px; max-height: 80px; }}
  form.inline {{ display: inline; }}
</style>
</head>
<body>
<nav>{nav}</nav>
{flashes}
<h1>{title}</h1>
{body}
</body>
</html>"#,
        title = escape(title),
        nav = nav(view.identity),
        flashes = flash_list(view.flashes),
    )
}

pub fn error_page(message: &str) -> String {
    layout(
        "Error",
        &View {
            identity: None,
            flashes: &[],
        },
        &format!("<p>{}</p>", escape(message)),
    )
}

pub fn home(view: &View<'_>) -> String {
    layout(
        "Welcome to Bazaar",
        view,
        r#"<p>Sellers list products, buyers place orders.</p>
<p><a href="/products">Browse products</a></p>"#,
    )
}

pub fn register(view: &View<'_>) -> String {
    layout(
        "Register",
        view,
        r#"<form method="post" action="/register">
  <p><label>Name <input name="name" required></label></p>
  <p><label>Email <input name="email" type="email" required></label></p>
  <p><label>Password <input name="password" type="password" required></label></p>
  <p><label>Role <select name="role">
    <option value="buyer">Buyer</option>
    <option value="seller">Seller</option>
  </select></label></p>
  <p><button type="submit">Register</button></p>
</form>"#,
    )
}

pub fn login(view: &View<'_>) -> String {
    layout(
        "Login",
        view,
        r#"<form method="post" action="/login">
  <p><label>Email <input name="email" type="email" required></label></p>
  <p><label>Password <input name="password" type="password" required></label></p>
  <p><button type="submit">Login</button></p>
</form>"#,
    )
}

fn image_cell(image: Option<&str>) -> String {
    image.map_or_else(String::new, |path| {
        format!(r#"<img class="thumb" src="/{}" alt="">"#, escape(path))
    })
}

pub fn dashboard(view: &View<'_>, who: &Identity, products: &[Product]) -> String {
    let mut body = format!("<p>Hello, {}.</p>", escape(&who.name));

    match who.role {
        Role::Seller => {
            body.push_str(r#"<p><a href="/add_product">Add product</a></p>"#);
            if products.is_empty() {
                body.push_str("<p>You have no products yet.</p>");
            } else {
                body.push_str(
                    "<table><thead><tr><th>Image</th><th>Name</th><th>Price</th><th></th></tr></thead><tbody>",
                );
                for p in products {
                    let _ = write!(
                        body,
                        r#"<tr><td>{image}</td><td>{name}</td><td>{price}</td><td>
<a href="/edit_product/{id}">Edit</a>
<form class="inline" method="post" action="/delete_product/{id}"><button type="submit">Delete</button></form>
</td></tr>"#,
                        image = image_cell(p.image.as_deref()),
                        name = escape(&p.product_name),
                        price = escape(&p.price),
                        id = p.product_id,
                    );
                }
                body.push_str("</tbody></table>");
            }
        }
        Role::Buyer => {
            body.push_str(r#"<p><a href="/products">Browse products</a> or see <a href="/orders">your orders</a>.</p>"#);
        }
    }

    layout("Dashboard", view, &body)
}

/// Add (`product: None`) or edit form. Leaving the file input empty on edit
/// keeps the current image.
pub fn product_form(view: &View<'_>, product: Option<&Product>) -> String {
    let (title, action, name, description, price) = match product {
        Some(p) => (
            "Edit Product",
            format!("/edit_product/{}", p.product_id),
            escape(&p.product_name),
            escape(&p.description),
            escape(&p.price),
        ),
        None => (
            "Add Product",
            "/add_product".to_string(),
            String::new(),
            String::new(),
            String::new(),
        ),
    };
    let current = product
        .and_then(|p| p.image.as_deref())
        .map(|path| format!("<p>Current image: {}</p>", image_cell(Some(path))))
        .unwrap_or_default();

    let body = format!(
        r#"<form method="post" action="{action}" enctype="multipart/form-data">
  <p><label>Name <input name="product_name" value="{name}" required></label></p>
  <p><label>Description <textarea name="description">{description}</textarea></label></p>
  <p><label>Price <input name="price" value="{price}" required></label></p>
  {current}
  <p><label>Image <input name="image" type="file" accept="image/*"></label></p>
  <p><button type="submit">Save</button></p>
</form>"#
    );

    layout(title, view, &body)
}

pub fn products(view: &View<'_>, products: &[Product]) -> String {
    let can_order = view.identity.is_some_and(|who| match who.role {
        Role::Buyer => true,
        Role::Seller => false,
    });

    if products.is_empty() {
        return layout("Products", view, "<p>No products yet.</p>");
    }

    let mut body = String::from(
        "<table><thead><tr><th>Image</th><th>Name</th><th>Description</th><th>Price</th><th></th></tr></thead><tbody>",
    );
    for p in products {
        let order = if can_order {
            format!(
                r#"<form class="inline" method="post" action="/place_order/{}"><button type="submit">Order</button></form>"#,
                p.product_id
            )
        } else {
            String::new()
        };
        let _ = write!(
            body,
            "<tr><td>{image}</td><td>{name}</td><td>{description}</td><td>{price}</td><td>{order}</td></tr>",
            image = image_cell(p.image.as_deref()),
            name = escape(&p.product_name),
            description = escape(&p.description),
            price = escape(&p.price),
        );
    }
    body.push_str("</tbody></table>");

    layout("Products", view, &body)
}

pub fn orders(view: &View<'_>, orders: &[OrderView]) -> String {
    if orders.is_empty() {
        return layout("Orders", view, "<p>No orders yet.</p>");
    }

    let mut body = String::from(
        "<table><thead><tr><th>Order</th><th>Buyer</th><th>Product</th><th>Seller</th><th>Status</th><th>Date</th></tr></thead><tbody>",
    );
    for o in orders {
        let _ = write!(
            body,
            "<tr><td>#{id}</td><td>{buyer}</td><td>{product}</td><td>{seller}</td><td>{status}</td><td>{date}</td></tr>",
            id = o.order_id,
            buyer = escape(&o.buyer_name),
            product = escape(&o.product_name),
            seller = escape(&o.seller_name),
            status = o.status,
            date = format_timestamp(o.order_date),
        );
    }
    body.push_str("</tbody></table>");

    layout("Orders", view, &body)
}
