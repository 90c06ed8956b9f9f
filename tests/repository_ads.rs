use ad_click_tracker::domain::click_event::ClickEvent;
use ad_click_tracker::domain::entities::NewAd;
use ad_click_tracker::domain::repositories::{AdRepository, StoreError};
use ad_click_tracker::infrastructure::persistence::PgAdRepository;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;

fn new_ad(id: &str) -> NewAd {
    NewAd {
        id: id.to_string(),
        image_url: format!("https://cdn.example.com/{id}.png"),
        target_url: format!("https://example.com/{id}"),
    }
}

#[sqlx::test]
async fn test_create_and_list_ads(pool: PgPool) {
    let repo = PgAdRepository::new(Arc::new(pool));

    let ad = repo.create_ad(new_ad("tech-001")).await.unwrap();
    repo.create_ad(new_ad("food-002")).await.unwrap();

    assert_eq!(ad.id, "tech-001");
    assert_eq!(ad.total_clicks, 0);

    let ads = repo.list_ads().await.unwrap();
    assert_eq!(ads.len(), 2);
    assert!(repo.exists_ad("tech-001").await.unwrap());
    assert!(!repo.exists_ad("ghost-404").await.unwrap());
}

#[sqlx::test]
async fn test_bulk_insert_is_idempotent_per_click_id(pool: PgPool) {
    let repo = PgAdRepository::new(Arc::new(pool));
    repo.create_ad(new_ad("tech-001")).await.unwrap();

    let now = Utc::now();
    let clicks: Vec<ClickEvent> = (0..5)
        .map(|i| ClickEvent::new("tech-001", format!("203.0.113.{i}"), i, now))
        .collect();

    repo.bulk_insert_clicks(&clicks).await.unwrap();
    repo.bulk_insert_clicks(&clicks).await.unwrap();

    let count = repo
        .count_clicks_in_window("tech-001", now - Duration::minutes(1), now)
        .await
        .unwrap();
    assert_eq!(count, 5);
}

#[sqlx::test]
async fn test_bulk_insert_empty_batch(pool: PgPool) {
    let repo = PgAdRepository::new(Arc::new(pool));

    assert!(repo.bulk_insert_clicks(&[]).await.is_ok());
}

#[sqlx::test]
async fn test_count_clicks_respects_window(pool: PgPool) {
    let repo = PgAdRepository::new(Arc::new(pool));
    repo.create_ad(new_ad("tech-001")).await.unwrap();

    let now = Utc::now();
    let clicks = vec![
        ClickEvent::new("tech-001", "203.0.113.5", 0, now - Duration::minutes(2)),
        ClickEvent::new("tech-001", "203.0.113.5", 0, now - Duration::minutes(30)),
        ClickEvent::new("tech-001", "203.0.113.5", 0, now - Duration::hours(5)),
    ];
    repo.bulk_insert_clicks(&clicks).await.unwrap();

    let last_hour = repo
        .count_clicks_in_window("tech-001", now - Duration::hours(1), now)
        .await
        .unwrap();
    let last_5m = repo
        .count_clicks_in_window("tech-001", now - Duration::minutes(5), now)
        .await
        .unwrap();

    assert_eq!(last_hour, 2);
    assert_eq!(last_5m, 1);
}

#[sqlx::test]
async fn test_increment_and_get_total(pool: PgPool) {
    let repo = PgAdRepository::new(Arc::new(pool));
    repo.create_ad(new_ad("tech-001")).await.unwrap();

    repo.increment_ad_total("tech-001", 3).await.unwrap();
    repo.increment_ad_total("tech-001", 1).await.unwrap();

    assert_eq!(repo.get_ad_total("tech-001").await.unwrap(), 4);
}

#[sqlx::test]
async fn test_unknown_ad_total(pool: PgPool) {
    let repo = PgAdRepository::new(Arc::new(pool));

    let get = repo.get_ad_total("ghost-404").await;
    let increment = repo.increment_ad_total("ghost-404", 1).await;

    assert!(matches!(get, Err(StoreError::AdNotFound(_))));
    assert!(matches!(increment, Err(StoreError::AdNotFound(_))));
}

#[sqlx::test]
async fn test_health_check(pool: PgPool) {
    let repo = PgAdRepository::new(Arc::new(pool));

    assert!(repo.health_check().await);
}
