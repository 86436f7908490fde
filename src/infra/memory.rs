//! In-memory store and cache for tests.
//!
//! [`MemoryStore`] implements [`TransactionManager`] with real scope
//! semantics: a scope works on a private copy of the tables and records its
//! writes; commit replays the writes against the committed tables with the
//! same constraint checks, so concurrent scopes can conflict. Faults can be
//! injected to exercise rollback and timeout paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::cache::CacheStore;
use super::repositories::{AccountRepository, OrderRepository};
use super::unit_of_work::{ScopedTransaction, TransactionManager, UnitOfWork};
use crate::domain::{Account, AccountChanges, AccountDraft, Order, OrderDraft};
use crate::errors::{AppError, AppResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    orders: BTreeMap<i64, Order>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.accounts
            .values()
            .any(|a| a.email == email && Some(a.id) != except)
    }

    fn insert_account(&mut self, account: Account) -> AppResult<()> {
        if self.email_taken(&account.email, None) {
            return Err(AppError::duplicate(format!("email {}", account.email)));
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    fn update_account(&mut self, id: i64, changes: &AccountChanges) -> AppResult<Account> {
        if let Some(email) = &changes.email {
            if self.email_taken(email, Some(id)) {
                return Err(AppError::duplicate(format!("email {}", email)));
            }
        }
        let account = self.accounts.get_mut(&id).ok_or(AppError::NotFound)?;
        changes.apply_to(account);
        Ok(account.clone())
    }

    fn delete_account(&mut self, id: i64) -> AppResult<()> {
        self.accounts.remove(&id).ok_or(AppError::NotFound)?;
        self.orders.retain(|_, order| order.account_id != id);
        Ok(())
    }

    fn insert_order(&mut self, order: Order) -> AppResult<()> {
        if !self.accounts.contains_key(&order.account_id) {
            return Err(AppError::conflict(format!(
                "account {} does not exist",
                order.account_id
            )));
        }
        self.orders.insert(order.id, order);
        Ok(())
    }

    fn apply(&mut self, write: &Write) -> AppResult<()> {
        match write {
            Write::InsertAccount(account) => self.insert_account(account.clone()),
            Write::UpdateAccount(id, changes) => self.update_account(*id, changes).map(|_| ()),
            Write::DeleteAccount(id) => self.delete_account(*id),
            Write::InsertOrder(order) => self.insert_order(order.clone()),
        }
    }
}

/// A write recorded by a scope, replayed on commit.
#[derive(Debug, Clone)]
enum Write {
    InsertAccount(Account),
    UpdateAccount(i64, AccountChanges),
    DeleteAccount(i64),
    InsertOrder(Order),
}

#[derive(Default)]
struct Faults {
    fail_begin: bool,
    fail_next_commit: bool,
    order_insert: Option<AppError>,
    begin_delay: Option<Duration>,
}

/// Counters observed by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    /// Account lookups by id or email, scoped or not.
    pub account_reads: usize,
}

#[derive(Default)]
struct Counters {
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    account_reads: AtomicUsize,
}

struct Shared {
    committed: Mutex<Tables>,
    next_account_id: AtomicI64,
    next_order_id: AtomicI64,
    faults: Mutex<Faults>,
    counters: Counters,
}

/// Where a repository reads and writes.
#[derive(Clone)]
enum Target {
    Committed,
    Scoped(Arc<Mutex<Working>>),
}

/// A scope's private copy of the tables plus its pending writes.
struct Working {
    tables: Tables,
    log: Vec<Write>,
}

impl Shared {
    /// Read from the view selected by `target`.
    fn read<R>(&self, target: &Target, f: impl FnOnce(&Tables) -> R) -> R {
        match target {
            Target::Committed => f(&lock(&self.committed)),
            Target::Scoped(working) => f(&lock(working).tables),
        }
    }

    /// Apply `write` to the view selected by `target`, recording it when scoped.
    fn write(&self, target: &Target, write: Write) -> AppResult<()> {
        match target {
            Target::Committed => lock(&self.committed).apply(&write),
            Target::Scoped(working) => {
                let mut working = lock(working);
                working.tables.apply(&write)?;
                working.log.push(write);
                Ok(())
            }
        }
    }
}

/// In-memory [`TransactionManager`].
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store; the first account gets id 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Empty store whose id sequences start at `first_id`.
    pub fn starting_at(first_id: i64) -> Self {
        Self {
            shared: Arc::new(Shared {
                committed: Mutex::new(Tables::default()),
                next_account_id: AtomicI64::new(first_id),
                next_order_id: AtomicI64::new(first_id),
                faults: Mutex::new(Faults::default()),
                counters: Counters::default(),
            }),
        }
    }

    /// Make every subsequent `begin` fail as if the store were down.
    pub fn fail_begin(&self, fail: bool) {
        lock(&self.shared.faults).fail_begin = fail;
    }

    /// Delay each `begin` by `delay`, after the scope took its snapshot.
    pub fn delay_begin(&self, delay: Duration) {
        lock(&self.shared.faults).begin_delay = Some(delay);
    }

    /// Make the next order insert fail with `error`.
    pub fn fail_next_order_insert(&self, error: AppError) {
        lock(&self.shared.faults).order_insert = Some(error);
    }

    /// Make the next scope commit fail with a conflict.
    pub fn fail_next_commit(&self) {
        lock(&self.shared.faults).fail_next_commit = true;
    }

    pub fn stats(&self) -> StoreStats {
        let c = &self.shared.counters;
        StoreStats {
            begins: c.begins.load(Ordering::SeqCst),
            commits: c.commits.load(Ordering::SeqCst),
            rollbacks: c.rollbacks.load(Ordering::SeqCst),
            account_reads: c.account_reads.load(Ordering::SeqCst),
        }
    }

    /// Committed accounts, ordered by id.
    pub fn accounts_snapshot(&self) -> Vec<Account> {
        lock(&self.shared.committed).accounts.values().cloned().collect()
    }

    /// Committed orders, ordered by id.
    pub fn orders_snapshot(&self) -> Vec<Order> {
        lock(&self.shared.committed).orders.values().cloned().collect()
    }

    /// Insert an account directly into the committed tables.
    pub fn seed_account(&self, draft: AccountDraft) -> AppResult<Account> {
        let account = self.account_from(draft);
        lock(&self.shared.committed).insert_account(account.clone())?;
        Ok(account)
    }

    fn account_from(&self, draft: AccountDraft) -> Account {
        Account {
            id: self.shared.next_account_id.fetch_add(1, Ordering::SeqCst),
            name: draft.name,
            email: draft.email,
            password_hash: draft.password_hash,
            role: draft.role,
            created_at: Utc::now(),
        }
    }

    fn repositories(&self, target: Target) -> (MemoryAccounts, MemoryOrders) {
        (
            MemoryAccounts {
                store: self.clone(),
                target: target.clone(),
            },
            MemoryOrders {
                store: self.clone(),
                target,
            },
        )
    }
}

#[async_trait]
impl TransactionManager for MemoryStore {
    fn accounts(&self) -> Arc<dyn AccountRepository> {
        Arc::new(self.repositories(Target::Committed).0)
    }

    fn orders(&self) -> Arc<dyn OrderRepository> {
        Arc::new(self.repositories(Target::Committed).1)
    }

    async fn begin(&self) -> AppResult<UnitOfWork> {
        let (fail, delay) = {
            let faults = lock(&self.shared.faults);
            (faults.fail_begin, faults.begin_delay)
        };
        if fail {
            return Err(AppError::connection("memory store is unavailable"));
        }

        // Snapshot first so scopes delayed together see the same tables
        let working = Arc::new(Mutex::new(Working {
            tables: lock(&self.shared.committed).clone(),
            log: Vec::new(),
        }));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.shared.counters.begins.fetch_add(1, Ordering::SeqCst);
        let (accounts, orders) = self.repositories(Target::Scoped(working.clone()));

        Ok(UnitOfWork::new(Box::new(MemoryScope {
            store: self.clone(),
            working,
            accounts,
            orders,
        })))
    }
}

struct MemoryScope {
    store: MemoryStore,
    working: Arc<Mutex<Working>>,
    accounts: MemoryAccounts,
    orders: MemoryOrders,
}

#[async_trait]
impl ScopedTransaction for MemoryScope {
    fn accounts(&self) -> &dyn AccountRepository {
        &self.accounts
    }

    fn orders(&self) -> &dyn OrderRepository {
        &self.orders
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let shared = &self.store.shared;

        let injected = std::mem::take(&mut lock(&shared.faults).fail_next_commit);
        if injected {
            return Err(AppError::conflict("injected commit failure"));
        }

        let log = std::mem::take(&mut lock(&self.working).log);
        let mut committed = lock(&shared.committed);

        // Replay on a copy so a failing write leaves the committed tables untouched
        let mut next = committed.clone();
        for write in &log {
            next.apply(write).map_err(|e| match e {
                AppError::DuplicateKey(detail) => AppError::Conflict(detail),
                other => other,
            })?;
        }
        *committed = next;

        shared.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.store
            .shared
            .counters
            .rollbacks
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryAccounts {
    store: MemoryStore,
    target: Target,
}

#[async_trait]
impl AccountRepository for MemoryAccounts {
    async fn create(&self, draft: AccountDraft) -> AppResult<Account> {
        let account = self.store.account_from(draft);
        self.store
            .shared
            .write(&self.target, Write::InsertAccount(account.clone()))?;
        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Account>> {
        let shared = &self.store.shared;
        shared.counters.account_reads.fetch_add(1, Ordering::SeqCst);
        Ok(shared.read(&self.target, |t| t.accounts.get(&id).cloned()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let shared = &self.store.shared;
        shared.counters.account_reads.fetch_add(1, Ordering::SeqCst);
        Ok(shared.read(&self.target, |t| {
            t.accounts.values().find(|a| a.email == email).cloned()
        }))
    }

    async fn update(&self, id: i64, changes: AccountChanges) -> AppResult<Account> {
        let shared = &self.store.shared;
        let mut updated = shared
            .read(&self.target, |t| t.accounts.get(&id).cloned())
            .ok_or(AppError::NotFound)?;
        changes.apply_to(&mut updated);

        shared.write(&self.target, Write::UpdateAccount(id, changes))?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.store
            .shared
            .write(&self.target, Write::DeleteAccount(id))
    }
}

struct MemoryOrders {
    store: MemoryStore,
    target: Target,
}

#[async_trait]
impl OrderRepository for MemoryOrders {
    async fn create(&self, draft: OrderDraft) -> AppResult<Order> {
        let shared = &self.store.shared;
        if let Some(error) = lock(&shared.faults).order_insert.take() {
            return Err(error);
        }

        let stored = Order {
            id: shared.next_order_id.fetch_add(1, Ordering::SeqCst),
            account_id: draft.account_id,
            amount: draft.amount,
            status: draft.status,
            created_at: Utc::now(),
            items: Vec::new(),
        };
        shared.write(&self.target, Write::InsertOrder(stored.clone()))?;

        Ok(Order {
            items: draft.items,
            ..stored
        })
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Order>> {
        Ok(self
            .store
            .shared
            .read(&self.target, |t| t.orders.get(&id).cloned()))
    }

    async fn list_by_account(&self, account_id: i64) -> AppResult<Vec<Order>> {
        Ok(self.store.shared.read(&self.target, |t| {
            t.orders
                .values()
                .filter(|o| o.account_id == account_id)
                .cloned()
                .collect()
        }))
    }
}

/// In-memory [`CacheStore`] with per-entry TTL and a disconnect switch.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
    disconnected: Arc<std::sync::atomic::AtomicBool>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// While disconnected every operation fails with `Connection`.
    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    /// Store a raw value, bypassing any encoding.
    pub fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        lock(&self.entries).insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    }

    /// Raw value currently stored under `key`, ignoring expiry.
    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).map(|(value, _)| value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }

    fn check(&self) -> AppResult<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(AppError::connection("memory cache is disconnected"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check()?;
        let mut entries = lock(&self.entries);
        match entries.get(key) {
            Some((_, expires)) if *expires <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        self.check()?;
        let expires = Instant::now() + Duration::from_secs(ttl_seconds);
        lock(&self.entries).insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.check()?;
        lock(&self.entries).remove(key);
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        self.check()
    }
}
