//! `PostgreSQL` implementation of the store traits.
//!
//! Queries use sqlx's runtime API rather than the compile-time macros, so the
//! crate builds without a live database or offline query cache. Row structs
//! decode raw column values and are converted into domain models; malformed
//! stored data surfaces as [`StoreError::DataCorruption`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copperleaf_core::{
    CurrencyCode, EntryId, EntryKind, OrderId, OrderStatus, Page, Paginated, UserId, WalletId,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::{Store, StoreError, StoreUnit};
use crate::models::{
    Cart, CartLine, LedgerEntry, NewLedgerEntry, NewOrder, Order, OrderItem, RelatedEntity,
    ShippingDetails, Wallet,
};

/// Store backed by the storefront `PostgreSQL` database.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool, for health checks and migrations.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A unit of work backed by a database transaction.
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

/// Map driver errors onto the store error taxonomy.
///
/// Serialization failures, deadlocks, and unique-key races all become
/// [`StoreError::Conflict`] so callers can retry; check-constraint failures
/// become [`StoreError::Invariant`].
fn map_db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        match db.code().as_deref() {
            Some("40001" | "40P01") => return StoreError::Conflict,
            Some("23514") => return StoreError::Invariant(db.message().to_owned()),
            _ => {}
        }
        if db.is_unique_violation() {
            return StoreError::Conflict;
        }
    }
    StoreError::Database(err)
}

// ===== Row types =====

#[derive(sqlx::FromRow)]
struct WalletRow {
    id: i32,
    user_id: i32,
    balance: Decimal,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = StoreError;

    fn try_from(row: WalletRow) -> Result<Self, StoreError> {
        let currency = row.currency.parse::<CurrencyCode>().map_err(|e| {
            StoreError::DataCorruption(format!("wallet {}: {e}", row.id))
        })?;
        Ok(Self {
            id: WalletId::new(row.id),
            user_id: UserId::new(row.user_id),
            balance: row.balance,
            currency,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    wallet_id: i32,
    user_id: i32,
    kind: String,
    amount: Decimal,
    balance_before: Decimal,
    balance_after: Decimal,
    description: String,
    related_entity_type: Option<String>,
    related_entity_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, StoreError> {
        let kind = row.kind.parse::<EntryKind>().map_err(|e| {
            StoreError::DataCorruption(format!("ledger entry {}: {e}", row.id))
        })?;
        let related = match (row.related_entity_type, row.related_entity_id) {
            (Some(entity_type), Some(entity_id)) => Some(RelatedEntity {
                entity_type,
                entity_id,
            }),
            (None, None) => None,
            _ => {
                return Err(StoreError::DataCorruption(format!(
                    "ledger entry {}: half-set related entity",
                    row.id
                )));
            }
        };
        Ok(Self {
            id: EntryId::new(row.id),
            wallet_id: WalletId::new(row.wallet_id),
            user_id: UserId::new(row.user_id),
            kind,
            amount: row.amount,
            balance_before: row.balance_before,
            balance_after: row.balance_after,
            description: row.description,
            related,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    user_id: i32,
    items: serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self, StoreError> {
        let lines: Vec<CartLine> = serde_json::from_value(row.items).map_err(|e| {
            StoreError::DataCorruption(format!("cart for user {}: {e}", row.user_id))
        })?;
        Ok(Self {
            user_id: UserId::new(row.user_id),
            lines,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    items: serde_json::Value,
    total_amount: Decimal,
    shipping_details: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, StoreError> {
        let items: Vec<OrderItem> = serde_json::from_value(row.items)
            .map_err(|e| StoreError::DataCorruption(format!("order {}: {e}", row.id)))?;
        let shipping_details: ShippingDetails = serde_json::from_value(row.shipping_details)
            .map_err(|e| StoreError::DataCorruption(format!("order {}: {e}", row.id)))?;
        let status = row.status.parse::<OrderStatus>().map_err(|e| {
            StoreError::DataCorruption(format!("order {}: {e}", row.id))
        })?;
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            items,
            total_amount: row.total_amount,
            shipping_details,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ===== Store =====

#[async_trait]
impl Store for PgStore {
    type Unit = PgUnit;

    async fn begin(&self) -> Result<PgUnit, StoreError> {
        let tx = self.pool.begin().await.map_err(map_db_err)?;
        Ok(PgUnit { tx })
    }

    async fn wallet_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query_as::<_, WalletRow>(
            r"
            SELECT id, user_id, balance, currency, created_at, updated_at
            FROM storefront.wallets
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Wallet::try_from).transpose()
    }

    async fn ledger_page(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Paginated<LedgerEntry>, StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM storefront.wallet_entries WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, EntryRow>(
            r"
            SELECT id, wallet_id, user_id, kind, amount, balance_before, balance_after,
                   description, related_entity_type, related_entity_id, created_at
            FROM storefront.wallet_entries
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(
            items,
            page,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    async fn cart_by_user(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT user_id, items, updated_at FROM storefront.carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Cart::try_from(row),
            None => Ok(Cart::empty(user_id)),
        }
    }

    async fn order_by_id(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, items, total_amount, shipping_details, status,
                   created_at, updated_at
            FROM storefront.orders
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn orders_page(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Paginated<Order>, StoreError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storefront.orders WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, items, total_amount, shipping_details, status,
                   created_at, updated_at
            FROM storefront.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(
            items,
            page,
            u64::try_from(total).unwrap_or_default(),
        ))
    }
}

// ===== StoreUnit =====

#[async_trait]
impl StoreUnit for PgUnit {
    async fn lock_wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query_as::<_, WalletRow>(
            r"
            SELECT id, user_id, balance, currency, created_at, updated_at
            FROM storefront.wallets
            WHERE user_id = $1
            FOR UPDATE
            ",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_err)?;

        row.map(Wallet::try_from).transpose()
    }

    async fn create_wallet(
        &mut self,
        user_id: UserId,
        currency: CurrencyCode,
    ) -> Result<Wallet, StoreError> {
        sqlx::query(
            r"
            INSERT INTO storefront.wallets (user_id, currency)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(currency.code())
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_err)?;

        self.lock_wallet(user_id)
            .await?
            .ok_or_else(|| StoreError::Backend("wallet row missing after upsert".to_owned()))
    }

    async fn apply_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        if entry.amount <= Decimal::ZERO {
            return Err(StoreError::Invariant(
                "ledger entry amount must be positive".to_owned(),
            ));
        }

        let row = sqlx::query_as::<_, WalletRow>(
            r"
            SELECT id, user_id, balance, currency, created_at, updated_at
            FROM storefront.wallets
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(entry.wallet_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_err)?;
        let wallet = Wallet::try_from(row.ok_or(StoreError::NotFound)?)?;

        let balance_before = wallet.balance;
        let balance_after = balance_before + entry.kind.signed_amount(entry.amount);
        if balance_after < Decimal::ZERO {
            return Err(StoreError::Invariant(format!(
                "wallet {} balance cannot go negative",
                wallet.id
            )));
        }

        sqlx::query("UPDATE storefront.wallets SET balance = $2, updated_at = now() WHERE id = $1")
            .bind(wallet.id)
            .bind(balance_after)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_err)?;

        let (entity_type, entity_id) = match &entry.related {
            Some(related) => (
                Some(related.entity_type.as_str()),
                Some(related.entity_id.as_str()),
            ),
            None => (None, None),
        };

        let row = sqlx::query_as::<_, EntryRow>(
            r"
            INSERT INTO storefront.wallet_entries
                (wallet_id, user_id, kind, amount, balance_before, balance_after,
                 description, related_entity_type, related_entity_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, wallet_id, user_id, kind, amount, balance_before, balance_after,
                      description, related_entity_type, related_entity_id, created_at
            ",
        )
        .bind(entry.wallet_id)
        .bind(entry.user_id)
        .bind(entry.kind.to_string())
        .bind(entry.amount)
        .bind(balance_before)
        .bind(balance_after)
        .bind(&entry.description)
        .bind(entity_type)
        .bind(entity_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_err)?;

        LedgerEntry::try_from(row)
    }

    async fn cart_for_update(&mut self, user_id: UserId) -> Result<Cart, StoreError> {
        sqlx::query("INSERT INTO storefront.carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_err)?;

        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT user_id, items, updated_at
            FROM storefront.carts
            WHERE user_id = $1
            FOR UPDATE
            ",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_err)?;

        row.map_or_else(
            || Err(StoreError::Backend("cart row missing after upsert".to_owned())),
            Cart::try_from,
        )
    }

    async fn put_cart(&mut self, cart: &Cart) -> Result<(), StoreError> {
        let items = serde_json::to_value(&cart.lines)
            .map_err(|e| StoreError::Backend(format!("failed to encode cart lines: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO storefront.carts (user_id, items, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(cart.user_id)
        .bind(items)
        .bind(cart.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM storefront.carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        let items = serde_json::to_value(&order.items)
            .map_err(|e| StoreError::Backend(format!("failed to encode order items: {e}")))?;
        let shipping = serde_json::to_value(&order.shipping_details)
            .map_err(|e| StoreError::Backend(format!("failed to encode shipping details: {e}")))?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO storefront.orders (user_id, items, total_amount, shipping_details, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, items, total_amount, shipping_details, status,
                      created_at, updated_at
            ",
        )
        .bind(order.user_id)
        .bind(items)
        .bind(order.total_amount)
        .bind(shipping)
        .bind(order.status.to_string())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_err)?;

        Order::try_from(row)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_db_err)
    }
}
