// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration, Utc};
use sitescan::config::settings::DatabaseSettings;
use sitescan::domain::models::target::{Target, TargetStatus};
use sitescan::domain::repositories::target_repository::{
    RepositoryError, SortField, SortOrder, TargetQuery, TargetRepository,
};
use sitescan::infrastructure::database::connection;
use sitescan::infrastructure::repositories::target_repo_impl::TargetRepositoryImpl;
use std::sync::Arc;
use uuid::Uuid;

async fn repository() -> TargetRepositoryImpl {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: None,
        min_connections: None,
        connect_timeout: Some(5),
        idle_timeout: None,
    };
    let db = connection::create_pool(&settings).await.unwrap();
    connection::run_migrations(&db).await.unwrap();
    TargetRepositoryImpl::new(Arc::new(db))
}

fn scanned(url: &str, title: &str, broken: i32, login: bool) -> Target {
    let mut target = Target::new(url);
    target.status = TargetStatus::Completed;
    target.title = title.to_string();
    target.html_version = "HTML5".to_string();
    target.broken_links = broken;
    target.has_login_form = login;
    target
}

#[tokio::test]
async fn test_create_and_find() {
    let repo = repository().await;
    let mut target = Target::new("https://example.com");
    target.headings_count.insert("h1".to_string(), 2);

    repo.create(&target).await.unwrap();

    let by_id = repo.find_by_id(target.id).await.unwrap().unwrap();
    assert_eq!(by_id.url, "https://example.com");
    assert_eq!(by_id.status, TargetStatus::Queued);
    assert_eq!(by_id.headings_count.get("h1"), Some(&2));
    assert!(by_id.crawl_started_at.is_none());

    let by_url = repo.find_by_url("https://example.com").await.unwrap();
    assert_eq!(by_url.map(|t| t.id), Some(target.id));
    assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_url_is_rejected() {
    let repo = repository().await;
    repo.create(&Target::new("https://example.com")).await.unwrap();

    let result = repo.create(&Target::new("https://example.com")).await;

    assert!(matches!(result, Err(RepositoryError::AlreadyExists)));
}

#[tokio::test]
async fn test_scan_lifecycle_writes() {
    let repo = repository().await;
    let mut target = repo.create(&Target::new("https://example.com")).await.unwrap();

    let started = Utc::now();
    repo.mark_crawl_started(target.id, started).await.unwrap();
    repo.update_status(target.id, TargetStatus::Crawling)
        .await
        .unwrap();

    let stored = repo.find_by_id(target.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TargetStatus::Crawling);
    assert!(stored.crawl_started_at.is_some());

    target.status = TargetStatus::Completed;
    target.title = "Example".to_string();
    target.internal_links = 4;
    target.broken_links = 1;
    target.headings_count.insert("h2".to_string(), 3);
    target.crawl_finished_at = Some(Utc::now());
    target.crawl_started_at = stored.crawl_started_at;
    repo.save(&target).await.unwrap();

    let stored = repo.find_by_id(target.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TargetStatus::Completed);
    assert_eq!(stored.title, "Example");
    assert_eq!(stored.internal_links, 4);
    assert_eq!(stored.broken_links, 1);
    assert_eq!(stored.headings_count.get("h2"), Some(&3));
    assert!(stored.crawl_finished_at.is_some());
}

#[tokio::test]
async fn test_writes_to_missing_target_report_not_found() {
    let repo = repository().await;
    let ghost = Target::new("https://ghost.example");

    assert!(matches!(
        repo.save(&ghost).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        repo.update_status(ghost.id, TargetStatus::Failed).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        repo.mark_crawl_started(ghost.id, Utc::now()).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        repo.delete(ghost.id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_list_filters_sorts_and_paginates() {
    let repo = repository().await;
    repo.create(&scanned("https://alpha.example", "Alpha shop", 0, true))
        .await
        .unwrap();
    repo.create(&scanned("https://beta.example", "Beta blog", 3, false))
        .await
        .unwrap();
    repo.create(&scanned("https://gamma.example", "Gamma shop", 7, false))
        .await
        .unwrap();
    repo.create(&Target::new("https://delta.example")).await.unwrap();

    let (all, total) = repo.list(&TargetQuery::default()).await.unwrap();
    assert_eq!(total, 4);
    assert_eq!(all.len(), 4);

    let (shops, total) = repo
        .list(&TargetQuery {
            search: Some("shop".to_string()),
            sort_by: SortField::Title,
            sort_order: SortOrder::Asc,
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(shops[0].title, "Alpha shop");
    assert_eq!(shops[1].title, "Gamma shop");

    let (queued, _) = repo
        .list(&TargetQuery {
            status: Some(TargetStatus::Queued),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].url, "https://delta.example");

    let (login, _) = repo
        .list(&TargetQuery {
            has_login_form: Some(true),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(login.len(), 1);
    assert_eq!(login[0].url, "https://alpha.example");

    let (ranged, total) = repo
        .list(&TargetQuery {
            broken_links_min: Some(1),
            broken_links_max: Some(5),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(ranged[0].url, "https://beta.example");

    let (page_two, total) = repo
        .list(&TargetQuery {
            page: 2,
            limit: 3,
            sort_by: SortField::BrokenLinks,
            sort_order: SortOrder::Desc,
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 4);
    assert_eq!(page_two.len(), 1);
    // the two zero-broken targets tie, so only assert the count on the last page
    assert_eq!(page_two[0].broken_links, 0);
}

#[tokio::test]
async fn test_list_filters_link_counts_and_dates() {
    let repo = repository().await;
    let now = Utc::now();

    let mut old = scanned("https://old.example", "Old", 0, false);
    old.created_at = now - Duration::days(30);
    old.internal_links = 2;
    old.external_links = 10;
    old.crawl_finished_at = Some(now - Duration::days(20));
    repo.create(&old).await.unwrap();

    let mut recent = scanned("https://recent.example", "Recent", 0, false);
    recent.created_at = now - Duration::days(2);
    recent.internal_links = 8;
    recent.external_links = 1;
    recent.crawl_finished_at = Some(now - Duration::days(1));
    repo.create(&recent).await.unwrap();

    let mut fresh = Target::new("https://fresh.example");
    fresh.created_at = now - Duration::hours(1);
    repo.create(&fresh).await.unwrap();

    let urls = |targets: Vec<Target>| {
        let mut urls: Vec<String> = targets.into_iter().map(|t| t.url).collect();
        urls.sort();
        urls
    };

    let (found, _) = repo
        .list(&TargetQuery {
            internal_links_min: Some(5),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(urls(found), vec!["https://recent.example"]);

    let (found, _) = repo
        .list(&TargetQuery {
            external_links_min: Some(1),
            external_links_max: Some(5),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(urls(found), vec!["https://recent.example"]);

    let (found, _) = repo
        .list(&TargetQuery {
            internal_links_max: Some(2),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(urls(found), vec!["https://fresh.example", "https://old.example"]);

    let (found, total) = repo
        .list(&TargetQuery {
            created_from: Some(now - Duration::days(7)),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(urls(found), vec!["https://fresh.example", "https://recent.example"]);

    let (found, _) = repo
        .list(&TargetQuery {
            created_to: Some(now - Duration::days(7)),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(urls(found), vec!["https://old.example"]);

    // never-scanned targets have no finish time and drop out of crawl-date filters
    let (found, _) = repo
        .list(&TargetQuery {
            crawled_from: Some(now - Duration::days(25)),
            crawled_to: Some(now - Duration::days(10)),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(urls(found), vec!["https://old.example"]);

    let (found, _) = repo
        .list(&TargetQuery {
            crawled_from: Some(now - Duration::days(5)),
            ..TargetQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(urls(found), vec!["https://recent.example"]);
}

#[tokio::test]
async fn test_delete_and_delete_many() {
    let repo = repository().await;
    let a = repo.create(&Target::new("https://a.example")).await.unwrap();
    let b = repo.create(&Target::new("https://b.example")).await.unwrap();
    let c = repo.create(&Target::new("https://c.example")).await.unwrap();

    repo.delete(a.id).await.unwrap();
    assert!(repo.find_by_id(a.id).await.unwrap().is_none());

    let removed = repo
        .delete_many(&[a.id, b.id, c.id, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(repo.delete_many(&[]).await.unwrap(), 0);
    assert_eq!(repo.list(&TargetQuery::default()).await.unwrap().1, 0);
}

#[tokio::test]
async fn test_reset_interrupted_marks_crawling_as_failed() {
    let repo = repository().await;
    let crawling = repo.create(&Target::new("https://a.example")).await.unwrap();
    let done = repo
        .create(&scanned("https://b.example", "B", 0, false))
        .await
        .unwrap();
    repo.update_status(crawling.id, TargetStatus::Crawling)
        .await
        .unwrap();

    assert_eq!(repo.reset_interrupted().await.unwrap(), 1);

    let crawling = repo.find_by_id(crawling.id).await.unwrap().unwrap();
    let done = repo.find_by_id(done.id).await.unwrap().unwrap();
    assert_eq!(crawling.status, TargetStatus::Failed);
    assert_eq!(done.status, TargetStatus::Completed);
    assert_eq!(repo.reset_interrupted().await.unwrap(), 0);
}
