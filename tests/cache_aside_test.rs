//! Cache-aside read path tests.
//!
//! The repository is a mock with call-count expectations, so every test
//! states exactly how often the store may be consulted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mockall::predicate::eq;

use account_orders::domain::{Account, Role};
use account_orders::errors::AppError;
use account_orders::infra::{CacheAside, CacheStore, MemoryCache, MockAccountRepository, ReadSource};

const TTL: Duration = Duration::from_secs(600);

fn account(id: i64) -> Account {
    Account {
        id,
        name: "Ann".to_string(),
        email: "ann@x.io".to_string(),
        password_hash: "$argon2id$hash".to_string(),
        role: Role::Member,
        created_at: Utc::now(),
    }
}

fn accessor(cache: &MemoryCache) -> CacheAside {
    CacheAside::new(Some(Arc::new(cache.clone())), TTL)
}

#[tokio::test]
async fn test_second_read_is_served_from_cache() {
    let cache = MemoryCache::new();
    let stored = account(7);
    let returned = stored.clone();

    let mut repo = MockAccountRepository::new();
    repo.expect_find_by_id()
        .with(eq(7))
        .times(1)
        .returning(move |_| Ok(Some(returned.clone())));

    let aside = accessor(&cache);

    let first = aside.get_account(&repo, 7).await.unwrap();
    assert_eq!(first.source, ReadSource::Store);
    assert!(cache.contains("account:7"));

    let second = aside.get_account(&repo, 7).await.unwrap();
    assert_eq!(second.source, ReadSource::Cache);
    assert_eq!(second.value, stored);
    assert_eq!(first.value, second.value);

    let stats = aside.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[tokio::test]
async fn test_not_found_reaches_store_every_time() {
    let cache = MemoryCache::new();

    let mut repo = MockAccountRepository::new();
    repo.expect_find_by_id().times(2).returning(|_| Ok(None));

    let aside = accessor(&cache);

    assert!(matches!(aside.get_account(&repo, 404).await, Err(AppError::NotFound)));
    assert!(!cache.contains("account:404"));
    assert!(matches!(aside.get_account(&repo, 404).await, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_poisoned_entry_is_a_miss_and_gets_replaced() {
    let cache = MemoryCache::new();
    cache.insert_raw("account:7", "{not json", TTL);

    let mut repo = MockAccountRepository::new();
    repo.expect_find_by_id()
        .times(1)
        .returning(|id| Ok(Some(account(id))));

    let aside = accessor(&cache);
    let lookup = aside.get_account(&repo, 7).await.unwrap();

    assert_eq!(lookup.source, ReadSource::Store);
    let repaired = cache.raw("account:7").unwrap();
    assert!(repaired.contains("\"expires_at\""));
}

#[tokio::test]
async fn test_disconnected_cache_never_surfaces_errors() {
    let cache = MemoryCache::new();
    cache.set_disconnected(true);

    let mut repo = MockAccountRepository::new();
    repo.expect_find_by_id()
        .times(2)
        .returning(|id| Ok(Some(account(id))));

    let aside = accessor(&cache);

    for _ in 0..2 {
        let lookup = aside.get_account(&repo, 7).await.unwrap();
        assert_eq!(lookup.source, ReadSource::Store);
    }
}

#[tokio::test]
async fn test_store_errors_propagate() {
    let cache = MemoryCache::new();

    let mut repo = MockAccountRepository::new();
    repo.expect_find_by_id()
        .times(1)
        .returning(|_| Err(AppError::connection("pool exhausted")));

    let result = accessor(&cache).get_account(&repo, 7).await;
    assert!(matches!(result, Err(AppError::Connection(_))));
}

#[tokio::test]
async fn test_invalidation_forces_store_read() {
    let cache = MemoryCache::new();

    let mut repo = MockAccountRepository::new();
    repo.expect_find_by_id()
        .times(2)
        .returning(|id| Ok(Some(account(id))));

    let aside = accessor(&cache);
    aside.get_account(&repo, 7).await.unwrap();

    aside.invalidate_account(7).await;
    assert!(cache.get("account:7").await.unwrap().is_none());

    let lookup = aside.get_account(&repo, 7).await.unwrap();
    assert_eq!(lookup.source, ReadSource::Store);
}
