//! Queue state survives a daemon restart

use std::sync::Arc;

use waitline_core::application::{QueueService, TransactionPolicy};
use waitline_core::domain::QueueId;
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::QueuePorts;
use waitline_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

async fn open(path: &str) -> QueueService {
    let pool = create_pool(path).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let store = Arc::new(SqliteQueueStore::new(pool, Arc::new(SystemTimeProvider)));
    QueueService::new(
        QueuePorts::from_store(store),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        TransactionPolicy::default(),
    )
}

#[tokio::test]
async fn test_positions_continue_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db").display().to_string();
    let q = QueueId::parse("myQueue").unwrap();

    {
        let svc = open(&path).await;
        for name in ["A", "B", "C"] {
            svc.enroll(&q, name).await.unwrap();
        }
        svc.advance(&q).await.unwrap();
    }

    let svc = open(&path).await;
    let view = svc.waiting_view(&q).await.unwrap();
    assert_eq!(view.current_position, 1);
    assert_eq!(view.positions(), vec![2, 3]);

    let next = svc.enroll(&q, "D").await.unwrap();
    assert_eq!(next.position, 4);
}

#[tokio::test]
async fn test_queues_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db").display().to_string();
    let svc = open(&path).await;
    let front = QueueId::parse("front-desk").unwrap();
    let back = QueueId::parse("back-office").unwrap();

    svc.enroll(&front, "A").await.unwrap();
    svc.enroll(&front, "B").await.unwrap();
    let first_back = svc.enroll(&back, "X").await.unwrap();
    svc.advance(&front).await.unwrap();

    assert_eq!(first_back.position, 1);
    assert_eq!(svc.waiting_view(&front).await.unwrap().positions(), vec![2]);
    assert_eq!(svc.waiting_view(&back).await.unwrap().positions(), vec![1]);
}
