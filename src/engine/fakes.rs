//! In-memory collaborators for tests.

use crate::client::{CartService, Catalog};
use crate::engine::Interpreter;
use crate::models::{
    Availability, Cart, CartItem, CartLine, CartbotError, CatalogField, CatalogProduct,
    CatalogQuery, Intent, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub fn product(id: u64, garment_type: &str, color: &str, size: &str, price: f64) -> CatalogProduct {
    CatalogProduct {
        id,
        name: None,
        garment_type: garment_type.to_string(),
        size: size.to_string(),
        color: color.to_string(),
        stock: 100,
        price50: Some(price),
        price100: None,
        price200: None,
        category: None,
        description: None,
        availability: Some(Availability::Label("Sí".to_string())),
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Catalog with the store's search semantics: every token of `q` must appear
/// in one of the text fields.
pub struct FakeCatalog {
    products: Vec<CatalogProduct>,
    searches: Mutex<Vec<CatalogQuery>>,
    fail: bool,
}

impl FakeCatalog {
    pub fn new(products: Vec<CatalogProduct>) -> Self {
        Self {
            products,
            searches: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn searches(&self) -> Vec<CatalogQuery> {
        self.searches.lock().unwrap().clone()
    }

    fn matches(product: &CatalogProduct, query: &CatalogQuery) -> bool {
        let text_ok = query.get(CatalogField::Text).is_none_or(|q| {
            q.split_whitespace().all(|token| {
                [
                    product.garment_type.as_str(),
                    product.color.as_str(),
                    product.size.as_str(),
                    product.category.as_deref().unwrap_or_default(),
                    product.description.as_deref().unwrap_or_default(),
                ]
                .iter()
                .any(|field| contains(field, token))
            })
        });
        let color_ok = query
            .get(CatalogField::Color)
            .is_none_or(|c| contains(&product.color, c));
        let size_ok = query
            .get(CatalogField::Size)
            .is_none_or(|s| contains(&product.size, s));
        text_ok && color_ok && size_ok
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogProduct>> {
        self.searches.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(CartbotError::Api {
                status: 500,
                message: "server error".to_string(),
            });
        }
        Ok(self
            .products
            .iter()
            .filter(|p| Self::matches(p, query))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<CatalogProduct>> {
        if self.fail {
            return Err(CartbotError::Api {
                status: 500,
                message: "server error".to_string(),
            });
        }
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }
}

/// Cart service that keeps carts in memory and records every write.
pub struct FakeCarts {
    catalog: Vec<CatalogProduct>,
    next_id: AtomicU64,
    carts: Mutex<HashMap<u64, Cart>>,
    created: Mutex<Vec<Vec<CartLine>>>,
    updated: Mutex<Vec<(u64, Vec<CartLine>)>>,
}

impl FakeCarts {
    pub fn new(catalog: Vec<CatalogProduct>) -> Self {
        Self {
            catalog,
            next_id: AtomicU64::new(1),
            carts: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
        }
    }

    /// Start cart ids at `id`.
    pub fn starting_at(self, id: u64) -> Self {
        self.next_id.store(id, Ordering::SeqCst);
        self
    }

    /// Seed an existing cart.
    pub fn with_cart(self, cart: Cart) -> Self {
        self.carts.lock().unwrap().insert(cart.id, cart);
        self
    }

    pub fn created(&self) -> Vec<Vec<CartLine>> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<(u64, Vec<CartLine>)> {
        self.updated.lock().unwrap().clone()
    }

    fn check(&self, line: &CartLine) -> Result<CatalogProduct> {
        let product = self
            .catalog
            .iter()
            .find(|p| p.id == line.product_id)
            .ok_or_else(|| {
                CartbotError::CartRejected(format!("product {} not found", line.product_id))
            })?;
        if product.stock < i64::from(line.qty) {
            return Err(CartbotError::CartRejected(format!(
                "insufficient stock for product {}",
                product.id
            )));
        }
        Ok(product.clone())
    }
}

#[async_trait]
impl CartService for FakeCarts {
    async fn create(&self, items: &[CartLine]) -> Result<Cart> {
        self.created.lock().unwrap().push(items.to_vec());
        // let a concurrent message run between check and write
        tokio::task::yield_now().await;

        let mut lines = Vec::with_capacity(items.len());
        for line in items {
            let product = self.check(line)?;
            lines.push(CartItem {
                product_id: line.product_id,
                qty: line.qty,
                product: Some(product),
            });
        }
        let cart = Cart {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            items: lines,
        };
        self.carts.lock().unwrap().insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn update(&self, cart_id: u64, items: &[CartLine]) -> Result<Cart> {
        self.updated.lock().unwrap().push((cart_id, items.to_vec()));
        let mut checked = Vec::with_capacity(items.len());
        for line in items {
            checked.push((*line, self.check(line)?));
        }

        let mut carts = self.carts.lock().unwrap();
        let cart = carts
            .get_mut(&cart_id)
            .ok_or_else(|| CartbotError::CartRejected("cart not found".to_string()))?;
        for (line, product) in checked {
            cart.items.retain(|item| item.product_id != line.product_id);
            if line.qty > 0 {
                cart.items.push(CartItem {
                    product_id: line.product_id,
                    qty: line.qty,
                    product: Some(product),
                });
            }
        }
        Ok(cart.clone())
    }

    async fn get(&self, cart_id: u64) -> Result<Option<Cart>> {
        Ok(self.carts.lock().unwrap().get(&cart_id).cloned())
    }
}

/// Interpreter that answers from a fixed script; unscripted text is `Unknown`.
#[derive(Default)]
pub struct ScriptedInterpreter {
    replies: HashMap<String, Intent>,
}

impl ScriptedInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, text: &str, intent: Intent) -> Self {
        self.replies.insert(text.to_string(), intent);
        self
    }
}

#[async_trait]
impl Interpreter for ScriptedInterpreter {
    async fn interpret(&self, text: &str) -> Intent {
        self.replies
            .get(text)
            .cloned()
            .unwrap_or_else(|| Intent::unknown(format!("unscripted: {text}")))
    }
}

/// Serve `app` on a free local port and return its base URL.
pub async fn serve_stub(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}
