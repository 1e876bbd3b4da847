//! Product and order operations built on the batch orchestrator.
//!
//! `create_order` writes the order, its items and the stock decrements as one
//! unit of work. On the local backend that unit is a transaction. On the
//! remote backend it is a plain sequence of calls: if a later statement fails,
//! everything sent before it stays applied. Each item row is written before
//! its stock decrement. Nothing compensates for a partial order here; callers
//! that need cleanup on the remote path must do it themselves.

use crate::batch::{Orchestrator, Transaction};
use crate::error::{ClientError, Result};
use crate::result::{Row, WriteOutcome};
use crate::schema::{
    ColumnConstraint, ColumnDefinition, DataType, DefaultValue, ForeignKey, ForeignKeyAction,
    IndexDefinition, Schema, TableDefinition,
};
use crate::statement::Statement;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub sku: String,
    pub stock_quantity: i64,
    pub status: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Product {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.i64("id")?,
            name: row.text("name")?,
            description: row.opt_text("description")?,
            price: row.f64("price")?,
            sku: row.text("sku")?,
            stock_quantity: row.i64("stock_quantity")?,
            status: row.text("status")?,
            created_at: row.opt_text("created_at")?,
            updated_at: row.opt_text("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub sku: String,
    pub stock_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
    pub product_name: Option<String>,
    pub sku: Option<String>,
}

impl OrderItem {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.i64("id")?,
            order_id: row.i64("order_id")?,
            product_id: row.i64("product_id")?,
            quantity: row.i64("quantity")?,
            unit_price: row.f64("unit_price")?,
            product_name: row.opt_text("product_name")?,
            sku: row.opt_text("sku")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub total_amount: f64,
    pub status: String,
    pub created_at: Option<String>,
    pub items: Vec<OrderItem>,
}

/// Sum of `unit_price * quantity`, computed before anything is written.
pub fn order_total(items: &[NewOrderItem]) -> f64 {
    items
        .iter()
        .map(|item| item.unit_price * item.quantity as f64)
        .sum()
}

/// Tables used by [`ShopStore`].
pub fn shop_schema() -> Schema {
    let id = || ColumnDefinition::new("id", DataType::Integer).constraint(ColumnConstraint::PrimaryKey);
    let timestamp = |name: &str| {
        ColumnDefinition::new(name, DataType::Timestamp).with_default(DefaultValue::CurrentTimestamp)
    };
    let required = |name: &str, data_type| {
        ColumnDefinition::new(name, data_type).constraint(ColumnConstraint::NotNull)
    };

    Schema::new()
        .add_table(
            TableDefinition::new("products")
                .column(id())
                .column(required("name", DataType::Text))
                .column(ColumnDefinition::new("description", DataType::Text))
                .column(required("price", DataType::Real))
                .column(required("sku", DataType::Text).constraint(ColumnConstraint::Unique))
                .column(required("stock_quantity", DataType::Integer).with_default(DefaultValue::Integer(0)))
                .column(required("status", DataType::Text).with_default(DefaultValue::Text("active".into())))
                .column(timestamp("created_at"))
                .column(timestamp("updated_at")),
        )
        .add_table(
            TableDefinition::new("orders")
                .column(id())
                .column(ColumnDefinition::new("user_id", DataType::Integer))
                .column(required("total_amount", DataType::Real))
                .column(required("status", DataType::Text).with_default(DefaultValue::Text("pending".into())))
                .column(timestamp("created_at"))
                .column(timestamp("updated_at")),
        )
        .add_table(
            TableDefinition::new("order_items")
                .column(id())
                .column(required("order_id", DataType::Integer))
                .column(required("product_id", DataType::Integer))
                .column(required("quantity", DataType::Integer))
                .column(required("price", DataType::Real))
                .foreign_key(ForeignKey::new("order_id", "orders", "id").on_delete(ForeignKeyAction::Cascade))
                // Checked at commit, so an unknown product surfaces as a
                // failed stock decrement rather than a constraint error.
                .foreign_key(ForeignKey::new("product_id", "products", "id").deferred())
                .index(IndexDefinition::new("idx_order_items_order_id", &["order_id"])),
        )
}

#[derive(Clone)]
pub struct ShopStore {
    orchestrator: Orchestrator,
}

impl ShopStore {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Create the shop tables if they are missing.
    pub async fn initialize_schema(&self) -> Result<()> {
        let statements = shop_schema().statements();
        self.orchestrator.execute_batch(&statements).await?;
        info!("[SHOP] schema ready ({} statements)", statements.len());
        Ok(())
    }

    /// Newest first.
    pub async fn list_products(&self, limit: u32, offset: u32) -> Result<Vec<Product>> {
        let stmt = Statement::new(
            "SELECT * FROM products ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset);
        let rows = self.orchestrator.execute(&stmt).await?.into_rows()?;
        rows.rows.iter().map(Product::from_row).collect()
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let stmt = Statement::new("SELECT * FROM products WHERE id = ?").bind(id);
        let rows = self.orchestrator.execute(&stmt).await?.into_rows()?;
        rows.first().map(Product::from_row).transpose()
    }

    /// Insert a product and return it as stored. Uses the row returned by the
    /// insert when the backend sends one, otherwise reads it back by id.
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        let stmt = Statement::new(
            "INSERT INTO products (name, description, price, sku, stock_quantity, status) \
             VALUES (?, ?, ?, ?, ?, 'active') RETURNING *",
        )
        .bind(product.name.as_str())
        .bind(product.description.clone())
        .bind(product.price)
        .bind(product.sku.as_str())
        .bind(product.stock_quantity);
        let outcome = self.orchestrator.execute(&stmt).await?.into_write()?;

        if let Some(row) = outcome.returned.first() {
            return Product::from_row(row);
        }
        let id = outcome.last_insert_id.ok_or_else(|| {
            ClientError::protocol("product insert returned neither a row nor an id")
        })?;
        debug!("[SHOP] insert returned no row, reading product {} back", id);
        self.get_product(id)
            .await?
            .ok_or(ClientError::NotFound { entity: "product", id })
    }

    /// Create an order, its items, and decrement stock for each item.
    pub async fn create_order(&self, items: &[NewOrderItem], user_id: Option<i64>) -> Result<Order> {
        let total = order_total(items);
        let mut tx = self.orchestrator.begin().await?;
        let order_id = match write_order(&mut tx, items, user_id, total).await {
            Ok(id) => id,
            Err(err) => {
                tx.rollback().await;
                return Err(err);
            }
        };
        tx.commit().await?;
        info!(
            "[SHOP] order {} created: {} items, total {:.2}",
            order_id,
            items.len(),
            total
        );
        self.get_order(order_id).await
    }

    /// Fetch an order with its items, each joined with product name and SKU.
    pub async fn get_order(&self, id: i64) -> Result<Order> {
        let stmt = Statement::new("SELECT * FROM orders WHERE id = ?").bind(id);
        let row = self
            .orchestrator
            .execute(&stmt)
            .await?
            .into_rows()?
            .into_first()
            .ok_or(ClientError::NotFound { entity: "order", id })?;

        let stmt = Statement::new(
            "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price AS unit_price, \
             p.name AS product_name, p.sku \
             FROM order_items oi JOIN products p ON oi.product_id = p.id \
             WHERE oi.order_id = ? ORDER BY oi.id",
        )
        .bind(id);
        let items = self
            .orchestrator
            .execute(&stmt)
            .await?
            .into_rows()?
            .rows
            .iter()
            .map(OrderItem::from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Order {
            id: row.i64("id")?,
            user_id: row.opt_i64("user_id")?,
            total_amount: row.f64("total_amount")?,
            status: row.text("status")?,
            created_at: row.opt_text("created_at")?,
            items,
        })
    }
}

fn inserted_id(outcome: &WriteOutcome) -> Result<i64> {
    match outcome.returned.first() {
        Some(row) => row.i64("id"),
        None => outcome
            .last_insert_id
            .ok_or_else(|| ClientError::protocol("order insert returned no id")),
    }
}

async fn write_order(
    tx: &mut Transaction,
    items: &[NewOrderItem],
    user_id: Option<i64>,
    total: f64,
) -> Result<i64> {
    let stmt = Statement::new(
        "INSERT INTO orders (user_id, total_amount, status) VALUES (?, ?, 'pending') RETURNING id",
    )
    .bind(user_id)
    .bind(total);
    let order_id = inserted_id(&tx.execute(&stmt).await?.into_write()?)?;

    for item in items {
        let stmt = Statement::new(
            "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price);
        tx.execute(&stmt).await?;

        let stmt = Statement::new(
            "UPDATE products SET stock_quantity = stock_quantity - ?, \
             updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(item.quantity)
        .bind(item.product_id);
        if tx.execute(&stmt).await?.rows_affected() == 0 {
            return Err(ClientError::NotFound {
                entity: "product",
                id: item.product_id,
            });
        }
    }
    Ok(order_id)
}
