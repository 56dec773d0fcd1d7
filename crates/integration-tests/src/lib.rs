//! Integration test support for the SDCart client.
//!
//! [`MockBackend`] serves the storefront REST API from an in-process axum
//! router bound to an ephemeral port. Tests point a real [`AppContext`] at
//! it and inspect both the client state and the requests the backend saw.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sdcart-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use sdcart_client::AppContext;
use sdcart_client::config::ClientConfig;
use sdcart_client::storage::MemoryStore;

/// Email accepted by the mock login endpoint.
pub const EMAIL: &str = "asha@example.com";

/// Password accepted by the mock login endpoint.
pub const PASSWORD: &str = "secret";

/// Expiry far enough ahead that no test run reaches it.
pub const FAR_FUTURE: i64 = 4_102_444_800;

/// Build an unsigned three-segment JWT carrying `sub` and `exp`.
#[must_use]
pub fn make_jwt(sub: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({ "sub": sub, "exp": exp, "role": "USER" });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// A request as seen by the backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// Mutable backend state.
#[derive(Debug)]
pub struct MockState {
    /// Token issued by the login endpoint and required by protected routes.
    pub token: String,
    /// Server-side cart entries in wire form.
    pub cart: Vec<Value>,
    /// Replaces the `GET /api/cart` body when set.
    pub cart_override: Option<Value>,
    /// Cart-entry ids whose removal fails with a server error.
    pub fail_remove: HashSet<i64>,
    /// Catalog products in wire form.
    pub products: Vec<Value>,
    /// Body of `GET /api/address`.
    pub address: Value,
    /// Every request in arrival order.
    pub requests: Vec<RecordedRequest>,
    /// Last cart-entry id handed out by the add endpoint.
    pub next_id: i64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            token: make_jwt(EMAIL, FAR_FUTURE),
            cart: Vec::new(),
            cart_override: None,
            fail_remove: HashSet::new(),
            products: default_products(),
            address: json!([]),
            requests: Vec::new(),
            next_id: 100,
        }
    }
}

fn default_products() -> Vec<Value> {
    vec![
        product("A", "Electric Kettle", 100, "Philips", "kitchen"),
        product("B", "Toaster", 50, "Philips", "kitchen"),
        product("C", "Desk Lamp", 2500, "Syska", "lighting"),
        product("D", "Hand Blender", 1800, "Bajaj", "kitchen"),
    ]
}

/// A catalog product in wire form.
#[must_use]
pub fn product(id: &str, name: &str, price: u32, brand: &str, category: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} by {brand}"),
        "price": price,
        "brand": brand,
        "category": category,
        "imageUrl": format!("https://img.example/{id}.png"),
        "stock": 10,
    })
}

/// A cart entry in wire form.
#[must_use]
pub fn cart_entry(id: i64, product_id: &str, price: u32, quantity: u32) -> Value {
    json!({
        "id": id,
        "productId": product_id,
        "name": format!("Product {product_id}"),
        "price": price,
        "quantity": quantity,
    })
}

type Shared = Arc<Mutex<MockState>>;

/// In-process storefront backend.
pub struct MockBackend {
    url: Url,
    state: Shared,
}

impl MockBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Shared::default();
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Listener has no address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock backend stopped");
        });

        Self {
            url: Url::parse(&format!("http://{addr}")).expect("Invalid mock backend URL"),
            state,
        }
    }

    /// Origin of the backend.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Lock the backend state for inspection or setup.
    ///
    /// # Panics
    ///
    /// Panics if a handler panicked while holding the lock.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("Mock state poisoned")
    }

    /// Requests matching `method` and `path`.
    #[must_use]
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// Drop the recorded requests.
    pub fn forget_requests(&self) {
        self.state().requests.clear();
    }

    /// A client context pointed at this backend with an in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn context(&self) -> AppContext {
        let config = ClientConfig::new(self.url.clone());
        AppContext::new(config, Arc::new(MemoryStore::new())).expect("Failed to build context")
    }

    /// A context that has signed in (and therefore loaded the cart).
    ///
    /// # Panics
    ///
    /// Panics if sign-in fails.
    pub async fn signed_in(&self) -> AppContext {
        let context = self.context();
        context
            .login(EMAIL, &SecretString::from(PASSWORD))
            .await
            .expect("Mock sign-in failed");
        context
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/user/userinfo", get(userinfo))
        .route("/api/cart", get(cart))
        .route("/api/cart/add", post(cart_add))
        .route("/api/cart/remove/{id}", delete(cart_remove))
        .route("/api/cart/clear", delete(cart_clear))
        .route("/api/address", get(address))
        .route("/api/address/add", post(address_saved))
        .route("/api/address/{id}", put(address_saved).delete(address_deleted))
        .route("/products/light", get(products_light))
        .route("/products/product/{id}", get(product_by_id))
        .route("/products/product/{id}/image", get(product_image))
        .route("/products/category/{name}", get(products_in_category))
        .route("/products/search", get(products_search))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().expect("Mock state poisoned")
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };
    lock(&state).requests.push(recorded);
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Check the bearer token; `Err` carries the 401 response.
fn authorize(state: &Shared, headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {}", lock(state).token);
    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if given == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    if body.email != EMAIL || body.password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    let token = lock(&state).token.clone();
    Json(json!({ "token": token })).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body.get("email").and_then(Value::as_str) == Some(EMAIL) {
        return error(StatusCode::CONFLICT, "Email already registered");
    }
    "User registered successfully".into_response()
}

async fn userinfo(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(json!({
        "user": {
            "email": EMAIL,
            "firstName": "Asha",
            "lastName": "Rao",
            "mobile": "9876543210",
        }
    }))
    .into_response()
}

async fn cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let state = lock(&state);
    let body = state
        .cart_override
        .clone()
        .unwrap_or_else(|| Value::Array(state.cart.clone()));
    Json(body).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_id: Value,
    quantity: u32,
}

async fn cart_add(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<AddBody>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let product_id = match &body.product_id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    };

    let mut state = lock(&state);
    let Some(price) = state
        .products
        .iter()
        .find(|p| p["id"] == product_id.as_str())
        .and_then(|p| p["price"].as_u64())
    else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };
    let price = u32::try_from(price).unwrap_or(u32::MAX);

    // Re-adding a product overwrites its quantity.
    if let Some(entry) = state
        .cart
        .iter_mut()
        .find(|entry| entry["productId"] == product_id.as_str())
    {
        entry["quantity"] = json!(body.quantity);
        return Json(entry.clone()).into_response();
    }

    state.next_id += 1;
    let entry = cart_entry(state.next_id, &product_id, price, body.quantity);
    state.cart.push(entry.clone());
    Json(entry).into_response()
}

async fn cart_remove(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let mut state = lock(&state);
    if state.fail_remove.contains(&id) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Could not remove item");
    }
    state.cart.retain(|entry| entry["id"] != id);
    StatusCode::OK.into_response()
}

async fn cart_clear(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    lock(&state).cart.clear();
    "Cart cleared".into_response()
}

async fn address(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(lock(&state).address.clone()).into_response()
}

async fn address_saved(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let mut saved = body;
    saved["id"] = json!(1);
    lock(&state).address = saved.clone();
    Json(saved).into_response()
}

async fn address_deleted(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    lock(&state).address = json!([]);
    StatusCode::NO_CONTENT.into_response()
}

async fn products_light(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let summaries: Vec<Value> = lock(&state)
        .products
        .iter()
        .map(|p| json!({ "id": p["id"], "name": p["name"], "price": p["price"] }))
        .collect();
    Json(summaries).into_response()
}

async fn product_by_id(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    lock(&state)
        .products
        .iter()
        .find(|p| p["id"] == id.as_str())
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Product not found"),
            |p| Json(p.clone()).into_response(),
        )
}

async fn product_image(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    // "PNG" in base64
    "UE5H".into_response()
}

async fn products_in_category(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let products: Vec<Value> = lock(&state)
        .products
        .iter()
        .filter(|p| p["category"] == name.as_str())
        .cloned()
        .collect();
    Json(products).into_response()
}

#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
    brand: Option<String>,
    category: Option<String>,
}

/// Matches brand, category and name. Price bounds are left to the client.
async fn products_search(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let field_matches = |field: &Value, wanted: Option<&str>| {
        wanted.is_none_or(|wanted| wanted.is_empty() || field == wanted)
    };

    let content: Vec<Value> = lock(&state)
        .products
        .iter()
        .filter(|p| field_matches(&p["brand"], params.brand.as_deref()))
        .filter(|p| field_matches(&p["category"], params.category.as_deref()))
        .filter(|p| {
            params.query.as_deref().is_none_or(|q| {
                p["name"]
                    .as_str()
                    .is_some_and(|name| name.to_lowercase().contains(&q.to_lowercase()))
            })
        })
        .cloned()
        .collect();

    let total = content.len();
    Json(json!({ "content": content, "totalElements": total })).into_response()
}
