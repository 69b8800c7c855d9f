// shop/src/services/product_service.rs

//! Catalog administration and browsing.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewProduct, Product, ProductChanges};
use crate::store::Stores;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub stock: i32,
}

impl CreateProductRequest {
  fn validate(&self, index: usize) -> AppResult<()> {
    if self.name.trim().is_empty() {
      return Err(AppError::Validation(format!("product {}: name is required", index)));
    }
    if self.description.trim().is_empty() {
      return Err(AppError::Validation(format!("product {}: description is required", index)));
    }
    if self.price_cents < 0 {
      return Err(AppError::Validation(format!("product {}: price must not be negative", index)));
    }
    if self.stock < 0 {
      return Err(AppError::Validation(format!("product {}: stock must not be negative", index)));
    }
    Ok(())
  }
}

impl From<CreateProductRequest> for NewProduct {
  fn from(req: CreateProductRequest) -> Self {
    Self {
      name: req.name.trim().to_string(),
      description: req.description.trim().to_string(),
      price_cents: req.price_cents,
      stock: req.stock,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price_cents: Option<i64>,
  pub stock: Option<i32>,
}

impl UpdateProductRequest {
  fn into_changes(self) -> AppResult<ProductChanges> {
    if matches!(&self.name, Some(name) if name.trim().is_empty()) {
      return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if matches!(&self.description, Some(d) if d.trim().is_empty()) {
      return Err(AppError::Validation("description must not be empty".to_string()));
    }
    if matches!(self.price_cents, Some(p) if p < 0) {
      return Err(AppError::Validation("price must not be negative".to_string()));
    }
    if matches!(self.stock, Some(s) if s < 0) {
      return Err(AppError::Validation("stock must not be negative".to_string()));
    }
    Ok(ProductChanges {
      name: self.name.map(|n| n.trim().to_string()),
      description: self.description.map(|d| d.trim().to_string()),
      price_cents: self.price_cents,
      stock: self.stock,
    })
  }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub current_page: i64,
  pub page_size: i64,
  pub total_pages: i64,
  pub total_count: i64,
  pub next_page: Option<i64>,
}

impl Pagination {
  pub fn new(current_page: i64, page_size: i64, total_count: i64) -> Self {
    let total_pages = (total_count + page_size - 1) / page_size;
    let next_page = (current_page < total_pages).then_some(current_page + 1);
    Self {
      current_page,
      page_size,
      total_pages,
      total_count,
      next_page,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
  pub products: Vec<Product>,
  pub pagination: Pagination,
}

#[derive(Clone)]
pub struct ProductService {
  stores: Stores,
}

impl ProductService {
  pub fn new(stores: Stores) -> Self {
    Self { stores }
  }

  /// Creates a batch of products. Every product is inserted or none is.
  ///
  /// # Arguments
  /// * `requests`: The products to create, in request order.
  ///
  /// # Returns
  /// The created products with their assigned ids.
  ///
  /// # Errors
  /// `Validation` when the batch is empty or any entry has an empty name or
  /// description or a negative price or stock. The index of the offending
  /// entry is part of the message.
  #[instrument(name = "ProductService::create_products", skip_all, fields(count = requests.len()), err(Display))]
  pub async fn create_products(&self, requests: Vec<CreateProductRequest>) -> AppResult<Vec<Product>> {
    if requests.is_empty() {
      return Err(AppError::Validation("at least one product is required".to_string()));
    }
    for (index, req) in requests.iter().enumerate() {
      req.validate(index)?;
    }

    let created = self
      .stores
      .products
      .create_many(requests.into_iter().map(NewProduct::from).collect())
      .await?;
    info!(count = created.len(), "Products created.");
    Ok(created)
  }

  /// Looks up one product. A missing product is `NotFound`.
  #[instrument(name = "ProductService::get_product", skip(self), err(Display))]
  pub async fn get_product(&self, product_id: i64) -> AppResult<Product> {
    self
      .stores
      .products
      .find_by_id(product_id)
      .await?
      .ok_or_else(|| product_not_found(product_id))
  }

  /// Applies a partial update. Fields left out of `request` keep their value.
  ///
  /// # Arguments
  /// * `product_id`: The product to change.
  /// * `request`: The fields to overwrite. An empty request returns the product unchanged.
  ///
  /// # Returns
  /// The product as stored after the update.
  ///
  /// # Errors
  /// `Validation` for an empty name or description or a negative price or
  /// stock, `NotFound` when the product does not exist.
  #[instrument(name = "ProductService::update_product", skip(self, request), err(Display))]
  pub async fn update_product(&self, product_id: i64, request: UpdateProductRequest) -> AppResult<Product> {
    let changes = request.into_changes()?;
    if changes.is_empty() {
      return self.get_product(product_id).await;
    }

    let product = self
      .stores
      .products
      .update(product_id, changes)
      .await?
      .ok_or_else(|| product_not_found(product_id))?;
    info!(product_id, "Product updated.");
    Ok(product)
  }

  /// Removes a product. Order items keep their product id and price.
  #[instrument(name = "ProductService::delete_product", skip(self), err(Display))]
  pub async fn delete_product(&self, product_id: i64) -> AppResult<()> {
    if !self.stores.products.delete(product_id).await? {
      return Err(product_not_found(product_id));
    }
    info!(product_id, "Product deleted.");
    Ok(())
  }

  /// Returns one page of the catalog, ordered by id.
  ///
  /// # Arguments
  /// * `page`: 1-based page number.
  /// * `page_size`: Products per page, at most `MAX_PAGE_SIZE`.
  ///
  /// # Returns
  /// The page's products and a `Pagination` block with the total count and
  /// the next page number, if any.
  ///
  /// # Errors
  /// `Validation` when `page` or `page_size` is out of range.
  #[instrument(name = "ProductService::list_products", skip(self), err(Display))]
  pub async fn list_products(&self, page: i64, page_size: i64) -> AppResult<ProductPage> {
    if page < 1 {
      return Err(AppError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
      return Err(AppError::Validation(format!("pageSize must be between 1 and {}", MAX_PAGE_SIZE)));
    }

    let offset = (page - 1)
      .checked_mul(page_size)
      .ok_or_else(|| AppError::Validation("page is out of range".to_string()))?;
    let (products, total_count) = self.stores.products.list_page(page_size, offset).await?;
    Ok(ProductPage {
      products,
      pagination: Pagination::new(page, page_size, total_count),
    })
  }

  /// Inserts the catalog entries whose names are not taken yet. Returns how
  /// many were inserted.
  #[instrument(name = "ProductService::seed_catalog", skip_all, err(Display))]
  pub async fn seed_catalog(&self, catalog: Vec<NewProduct>) -> AppResult<usize> {
    let names: Vec<String> = catalog.iter().map(|p| p.name.clone()).collect();
    let existing = self.stores.products.find_by_names(&names).await?;

    let missing: Vec<NewProduct> = catalog
      .into_iter()
      .filter(|p| !existing.iter().any(|e| e.name == p.name))
      .collect();
    if missing.is_empty() {
      info!("Catalog already seeded.");
      return Ok(0);
    }

    let created = self.stores.products.create_many(missing).await?;
    info!(count = created.len(), "Catalog seeded.");
    Ok(created.len())
  }
}

fn product_not_found(product_id: i64) -> AppError {
  warn!(product_id, "Product not found.");
  AppError::NotFound(format!("product {} not found", product_id))
}
