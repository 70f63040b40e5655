use orderflow::application::engine::LifecycleEngine;
use orderflow::config::Settings;
use orderflow::domain::order::{ActorId, ContextId, OrderId, OrderStatus};
use orderflow::domain::ports::OrderRegistryBox;
use orderflow::error::{ErrorKind, OrderError};
use orderflow::infrastructure::in_memory::InMemoryOrderRegistry;
use orderflow::infrastructure::roster::StaticAdminRoster;
use orderflow::infrastructure::sandbox::SandboxPaymentProvider;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const REQUESTER: ActorId = ActorId(100);

fn engine_on(
    registry: OrderRegistryBox,
    provider: &SandboxPaymentProvider,
    admins: Vec<ActorId>,
    settings: Settings,
) -> Arc<LifecycleEngine> {
    Arc::new(LifecycleEngine::new(
        registry,
        Box::new(provider.clone()),
        Box::new(StaticAdminRoster::new(admins)),
        settings,
    ))
}

fn engine(provider: &SandboxPaymentProvider, admins: Vec<ActorId>) -> Arc<LifecycleEngine> {
    engine_on(
        Box::new(InMemoryOrderRegistry::new()),
        provider,
        admins,
        Settings::default(),
    )
}

/// Fires one accept per admin at the same pending order and checks that
/// exactly one of them prices it.
async fn assert_single_acceptance(
    engine: Arc<LifecycleEngine>,
    provider: &SandboxPaymentProvider,
    admins: Vec<ActorId>,
) {
    let id = OrderId::new("race");
    engine
        .submit(REQUESTER, id.clone(), "Contested order body", ContextId(1))
        .await
        .unwrap();

    let contenders = admins.len();
    let handles: Vec<_> = admins
        .into_iter()
        .map(|admin| {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            tokio::spawn(async move { engine.accept(admin, &id, dec!(1500)).await })
        })
        .collect();

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(transition) => {
                successes += 1;
                assert_eq!(transition.order.status, OrderStatus::Accepted);
            }
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::Conflict, "unexpected error: {e}");
                conflicts += 1;
            }
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, contenders - 1);
    assert_eq!(provider.invoices_created(), 1);
    let order = engine.order(&id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Accepted);
    assert!(order.pricing_claim.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_issue_one_invoice() {
    let provider = SandboxPaymentProvider::default();
    // Slow invoice creation keeps the race window wide open.
    provider.set_latency(Duration::from_millis(50));
    let admins: Vec<ActorId> = (1..=8).map(ActorId).collect();
    let engine = engine(&provider, admins.clone());
    assert_single_acceptance(engine, &provider, admins).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zero_lease_still_issues_one_invoice() {
    let provider = SandboxPaymentProvider::default();
    provider.set_latency(Duration::from_millis(100));
    let admins = vec![ActorId(1), ActorId(2)];
    let settings = Settings {
        claim_lease_secs: 0,
        ..Settings::default()
    };
    let engine = engine_on(
        Box::new(InMemoryOrderRegistry::new()),
        &provider,
        admins.clone(),
        settings,
    );
    assert_single_acceptance(engine, &provider, admins).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_claim_outlives_slow_invoice_call() {
    let provider = SandboxPaymentProvider::default();
    provider.set_latency(Duration::from_millis(1_500));
    let settings = Settings {
        claim_lease_secs: 1,
        provider_timeout_ms: 5_000,
        ..Settings::default()
    };
    let engine = engine_on(
        Box::new(InMemoryOrderRegistry::new()),
        &provider,
        vec![ActorId(1), ActorId(2)],
        settings,
    );
    let id = OrderId::new("slow");
    engine
        .submit(REQUESTER, id.clone(), "Contested order body", ContextId(1))
        .await
        .unwrap();

    let first = {
        let engine = Arc::clone(&engine);
        let id = id.clone();
        tokio::spawn(async move { engine.accept(ActorId(1), &id, dec!(10)).await })
    };
    // Past the configured one-second lease while the first call is in flight.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let second = engine.accept(ActorId(2), &id, dec!(20)).await;
    assert!(matches!(second, Err(OrderError::PricingInProgress(_))));

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.order.status, OrderStatus::Accepted);
    assert_eq!(first.order.price().unwrap().value(), dec!(10));
    assert_eq!(provider.invoices_created(), 1);
}

#[cfg(feature = "storage-rocksdb")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_on_rocksdb_issue_one_invoice() {
    use orderflow::infrastructure::rocksdb::RocksDBOrderRegistry;

    let dir = tempfile::tempdir().unwrap();
    let registry = RocksDBOrderRegistry::open(dir.path()).unwrap();
    let provider = SandboxPaymentProvider::default();
    provider.set_latency(Duration::from_millis(50));
    let admins: Vec<ActorId> = (1..=8).map(ActorId).collect();
    let engine = engine_on(
        Box::new(registry),
        &provider,
        admins.clone(),
        Settings::default(),
    );
    assert_single_acceptance(engine, &provider, admins).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_accept_and_reject_race_has_one_winner() {
    let provider = SandboxPaymentProvider::default();
    provider.set_latency(Duration::from_millis(20));
    let engine = engine(&provider, vec![ActorId(1), ActorId(2)]);

    for round in 0..10 {
        let id = OrderId::new(format!("duel-{round}"));
        engine
            .submit(REQUESTER, id.clone(), "Contested order body", ContextId(1))
            .await
            .unwrap();

        let accept = {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            tokio::spawn(async move { engine.accept(ActorId(1), &id, dec!(10)).await })
        };
        let reject = {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            tokio::spawn(async move { engine.reject(ActorId(2), &id, "changed my mind").await })
        };

        let accepted = accept.await.unwrap();
        let rejected = reject.await.unwrap();
        assert!(
            accepted.is_ok() ^ rejected.is_ok(),
            "round {round}: exactly one transition must win"
        );

        let order = engine.order(&id).await.unwrap();
        match order.status {
            OrderStatus::Accepted => assert!(order.billing.is_some()),
            OrderStatus::Rejected => assert!(order.billing.is_none()),
            other => panic!("round {round}: unexpected status {other}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_click_confirm_pays_once() {
    let provider = SandboxPaymentProvider::default();
    let engine = engine(&provider, vec![ActorId(1)]);
    let id = OrderId::new("double");
    engine
        .submit(REQUESTER, id.clone(), "Pay me only once please", ContextId(1))
        .await
        .unwrap();
    engine.accept(ActorId(1), &id, dec!(99.99)).await.unwrap();
    assert!(provider.mark_paid("double"));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            tokio::spawn(async move { engine.confirm_payment(REQUESTER, &id).await })
        })
        .collect();

    let mut paid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => paid += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
        }
    }
    assert_eq!(paid, 1);
    assert_eq!(engine.order(&id).await.unwrap().status, OrderStatus::Paid);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_orders_progress_in_parallel() {
    let provider = SandboxPaymentProvider::default();
    provider.set_latency(Duration::from_millis(100));
    let engine = engine(&provider, vec![ActorId(1)]);

    let ids: Vec<OrderId> = (0..16).map(|i| OrderId::new(format!("p-{i}"))).collect();
    for id in &ids {
        engine
            .submit(REQUESTER, id.clone(), "Independent order body", ContextId(1))
            .await
            .unwrap();
    }

    let started = std::time::Instant::now();
    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.accept(ActorId(1), &id, dec!(5)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Sequential processing would need at least 16 * 100ms.
    assert!(started.elapsed() < Duration::from_millis(1_200));
    assert_eq!(provider.invoices_created(), 16);
}
