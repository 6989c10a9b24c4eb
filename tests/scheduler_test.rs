mod common;

use std::sync::Arc;
use std::time::Duration;

use academy_billing::services::{BillingPolicy, HorizonScheduler};
use common::*;

#[tokio::test]
async fn test_scheduler_initialization() {
    let pool = setup_db().await;
    let billing = Arc::new(service(&pool, date(2026, 2, 1), BillingPolicy::default()));

    let scheduler = HorizonScheduler::new(billing, 10);
    assert_eq!(scheduler.interval(), Duration::from_secs(10));
}

#[tokio::test]
async fn test_scheduler_run_once_extends_horizon() {
    let pool = setup_db().await;
    insert_student(&pool, "s1", date(2026, 1, 20), Some(date(2026, 2, 17)), 10).await;
    insert_course(&pool, "piano", 300_000, &[2]).await;
    service(&pool, date(2026, 2, 1), BillingPolicy::default())
        .enroll("s1", "piano")
        .await
        .expect("enroll failed");
    assert_eq!(payments(&pool, "s1").await.len(), 11);

    let billing = Arc::new(service(&pool, date(2026, 3, 5), BillingPolicy::default()));
    let scheduler = HorizonScheduler::new(billing, 1);
    scheduler.run_once().await;

    // A March pass reaches one month further than the enrollment did.
    assert_eq!(payments(&pool, "s1").await.len(), 12);

    let billing = Arc::new(service(&pool, date(2026, 9, 1), BillingPolicy::default()));
    HorizonScheduler::new(billing, 1).run_once().await;
    // Through August 2027.
    assert_eq!(payments(&pool, "s1").await.len(), 18);
}

#[tokio::test]
async fn test_scheduler_short_interval() {
    let pool = setup_db().await;
    insert_student(&pool, "s1", date(2026, 1, 20), Some(date(2026, 2, 17)), 10).await;
    insert_course(&pool, "piano", 300_000, &[2]).await;
    service(&pool, date(2026, 2, 1), BillingPolicy::default())
        .enroll("s1", "piano")
        .await
        .expect("enroll failed");

    let billing = Arc::new(service(&pool, date(2026, 9, 1), BillingPolicy::default()));
    let scheduler = HorizonScheduler::new(billing, 1);

    let scheduler_task = tokio::spawn(async move {
        scheduler.start().await;
    });

    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Repeated passes converge on the same set of charges.
    assert_eq!(payments(&pool, "s1").await.len(), 18);
    scheduler_task.abort();
}
