//! In-memory implementation of the store traits.
//!
//! Backs service and integration tests so they exercise real transaction
//! semantics without a running `PostgreSQL`. A unit of work holds the store's
//! single mutex for its whole lifetime, which serializes units the way row
//! locks serialize competing transactions. Writes are staged per unit and
//! only applied on commit; a dropped unit discards them. Id counters are
//! burned at stage time, so a rolled-back unit skips ids just like a database
//! sequence.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use copperleaf_core::{
    CurrencyCode, EntryId, OrderId, Page, Paginated, UserId, WalletId,
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreError, StoreUnit};
use crate::models::{Cart, LedgerEntry, NewLedgerEntry, NewOrder, Order, Wallet};

#[derive(Debug)]
struct State {
    wallets: HashMap<UserId, Wallet>,
    entries: Vec<LedgerEntry>,
    carts: HashMap<UserId, Cart>,
    orders: Vec<Order>,
    next_wallet_id: i32,
    next_entry_id: i64,
    next_order_id: i32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            wallets: HashMap::new(),
            entries: Vec::new(),
            carts: HashMap::new(),
            orders: Vec::new(),
            next_wallet_id: 1,
            next_entry_id: 1,
            next_order_id: 1,
        }
    }
}

/// Store keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_next_order_insert: Arc<AtomicBool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`StoreUnit::insert_order`] fail with a backend error.
    ///
    /// Lets tests prove that a failed checkout leaves no partial writes
    /// behind.
    pub fn fail_next_order_insert(&self) {
        self.fail_next_order_insert.store(true, Ordering::SeqCst);
    }
}

/// Writes staged by one unit, applied to the shared state on commit.
#[derive(Debug, Default)]
struct StagedWrites {
    wallets: HashMap<UserId, Wallet>,
    entries: Vec<LedgerEntry>,
    /// `Some` stages a cart document, `None` stages its deletion.
    carts: HashMap<UserId, Option<Cart>>,
    orders: Vec<Order>,
}

/// A unit of work over the in-memory state.
///
/// Holding the owned guard keeps every other unit waiting in `begin`, so
/// reads within a unit are stable and writes cannot interleave.
pub struct MemoryUnit {
    state: OwnedMutexGuard<State>,
    staged: StagedWrites,
    fail_next_order_insert: Arc<AtomicBool>,
}

impl MemoryUnit {
    fn wallet_by_user(&self, user_id: UserId) -> Option<Wallet> {
        self.staged
            .wallets
            .get(&user_id)
            .or_else(|| self.state.wallets.get(&user_id))
            .cloned()
    }

    fn wallet_by_id(&self, wallet_id: WalletId) -> Option<Wallet> {
        self.staged
            .wallets
            .values()
            .find(|w| w.id == wallet_id)
            .or_else(|| self.state.wallets.values().find(|w| w.id == wallet_id))
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, StoreError> {
        let state = Arc::clone(&self.state).lock_owned().await;
        Ok(MemoryUnit {
            state,
            staged: StagedWrites::default(),
            fail_next_order_insert: Arc::clone(&self.fail_next_order_insert),
        })
    }

    async fn wallet_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.wallets.get(&user_id).cloned())
    }

    async fn ledger_page(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Paginated<LedgerEntry>, StoreError> {
        let state = self.state.lock().await;
        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_i64().cmp(&a.id.as_i64()))
        });
        Ok(paginate(entries, page))
    }

    async fn cart_by_user(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id)))
    }

    async fn order_by_id(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    async fn orders_page(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Paginated<Order>, StoreError> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_i32().cmp(&a.id.as_i32()))
        });
        Ok(paginate(orders, page))
    }
}

fn paginate<T>(all: Vec<T>, page: Page) -> Paginated<T> {
    let total = all.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or_default();
    let items: Vec<T> = all.into_iter().skip(offset).take(limit).collect();
    Paginated::new(items, page, total)
}

#[async_trait]
impl StoreUnit for MemoryUnit {
    async fn lock_wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        Ok(self.wallet_by_user(user_id))
    }

    async fn create_wallet(
        &mut self,
        user_id: UserId,
        currency: CurrencyCode,
    ) -> Result<Wallet, StoreError> {
        if let Some(wallet) = self.wallet_by_user(user_id) {
            return Ok(wallet);
        }
        let now = Utc::now();
        let id = self.state.next_wallet_id;
        self.state.next_wallet_id += 1;
        let wallet = Wallet {
            id: WalletId::new(id),
            user_id,
            balance: Decimal::ZERO,
            currency,
            created_at: now,
            updated_at: now,
        };
        self.staged.wallets.insert(user_id, wallet.clone());
        Ok(wallet)
    }

    async fn apply_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        if entry.amount <= Decimal::ZERO {
            return Err(StoreError::Invariant(
                "ledger entry amount must be positive".to_owned(),
            ));
        }

        let mut wallet = self.wallet_by_id(entry.wallet_id).ok_or(StoreError::NotFound)?;

        let balance_before = wallet.balance;
        let balance_after = balance_before + entry.kind.signed_amount(entry.amount);
        if balance_after < Decimal::ZERO {
            return Err(StoreError::Invariant(format!(
                "wallet {} balance cannot go negative",
                wallet.id
            )));
        }

        let now = Utc::now();
        let id = self.state.next_entry_id;
        self.state.next_entry_id += 1;

        wallet.balance = balance_after;
        wallet.updated_at = now;
        self.staged.wallets.insert(wallet.user_id, wallet);

        let ledger_entry = LedgerEntry {
            id: EntryId::new(id),
            wallet_id: entry.wallet_id,
            user_id: entry.user_id,
            kind: entry.kind,
            amount: entry.amount,
            balance_before,
            balance_after,
            description: entry.description,
            related: entry.related,
            created_at: now,
        };
        self.staged.entries.push(ledger_entry.clone());
        Ok(ledger_entry)
    }

    async fn cart_for_update(&mut self, user_id: UserId) -> Result<Cart, StoreError> {
        if let Some(staged) = self.staged.carts.get(&user_id) {
            return Ok(staged
                .clone()
                .unwrap_or_else(|| Cart::empty(user_id)));
        }
        Ok(self
            .state
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id)))
    }

    async fn put_cart(&mut self, cart: &Cart) -> Result<(), StoreError> {
        self.staged.carts.insert(cart.user_id, Some(cart.clone()));
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<(), StoreError> {
        self.staged.carts.insert(user_id, None);
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        if self.fail_next_order_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected order insert failure".to_owned()));
        }
        let now = Utc::now();
        let id = self.state.next_order_id;
        self.state.next_order_id += 1;
        let order = Order {
            id: OrderId::new(id),
            user_id: order.user_id,
            items: order.items,
            total_amount: order.total_amount,
            shipping_details: order.shipping_details,
            status: order.status,
            created_at: now,
            updated_at: now,
        };
        self.staged.orders.push(order.clone());
        Ok(order)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        for (user_id, wallet) in staged.wallets {
            self.state.wallets.insert(user_id, wallet);
        }
        self.state.entries.extend(staged.entries);
        for (user_id, cart) in staged.carts {
            match cart {
                Some(cart) => {
                    self.state.carts.insert(user_id, cart);
                }
                None => {
                    self.state.carts.remove(&user_id);
                }
            }
        }
        self.state.orders.extend(staged.orders);
        Ok(())
    }
}
