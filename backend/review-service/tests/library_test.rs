mod common;

use common::Harness;
use review_service::error::AppError;
use review_service::models::{ListKind, PageRequest};
use uuid::Uuid;

#[tokio::test]
async fn test_favorites_round_trip() {
    let h = Harness::new().await;
    let favorites = &h.services.library;

    favorites.add(ListKind::Favorites, h.alice, h.movie).await.unwrap();
    favorites.add(ListKind::Favorites, h.alice, h.series).await.unwrap();
    favorites.add(ListKind::Favorites, h.bob, h.movie).await.unwrap();

    let page = favorites
        .list(ListKind::Favorites, h.alice, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    // Newest first
    assert_eq!(page.items[0].entry.content_id, h.series);
    assert_eq!(page.items[0].content.as_ref().unwrap().title, "The Wire");

    assert!(favorites.contains(ListKind::Favorites, h.alice, h.movie).await.unwrap());
    assert_eq!(favorites.count_for_content(ListKind::Favorites, h.movie).await.unwrap(), 2);
    assert_eq!(favorites.count_for_user(ListKind::Favorites, h.alice).await.unwrap(), 2);

    favorites.remove(ListKind::Favorites, h.alice, h.movie).await.unwrap();
    assert!(!favorites.contains(ListKind::Favorites, h.alice, h.movie).await.unwrap());
    assert_eq!(favorites.count_for_content(ListKind::Favorites, h.movie).await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_add_is_rejected() {
    let h = Harness::new().await;
    h.services
        .library
        .add(ListKind::Watchlist, h.alice, h.movie)
        .await
        .unwrap();

    let err = h
        .services
        .library
        .add(ListKind::Watchlist, h.alice, h.movie)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists(_)));
}

#[tokio::test]
async fn test_lists_are_independent() {
    let h = Harness::new().await;
    h.services
        .library
        .add(ListKind::Watchlist, h.alice, h.movie)
        .await
        .unwrap();

    assert!(!h
        .services
        .library
        .contains(ListKind::Favorites, h.alice, h.movie)
        .await
        .unwrap());
    // Same title may sit on both lists.
    h.services
        .library
        .add(ListKind::Favorites, h.alice, h.movie)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_content_and_missing_entry() {
    let h = Harness::new().await;

    let err = h
        .services
        .library
        .add(ListKind::Favorites, h.alice, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = h
        .services
        .library
        .remove(ListKind::Watchlist, h.alice, h.movie)
        .await
        .unwrap_err();
    match err {
        AppError::NotFound(msg) => assert!(msg.contains("not in your watchlist")),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_listing_pages() {
    let h = Harness::new().await;
    let mut titles = Vec::new();
    for i in 0..5 {
        let id = h.memory.add_movie(&format!("Movie {}", i)).await;
        h.services
            .library
            .add(ListKind::Watchlist, h.bob, id)
            .await
            .unwrap();
        titles.push(id);
    }

    let second = h
        .services
        .library
        .list(ListKind::Watchlist, h.bob, PageRequest::new(Some(2), Some(2)))
        .await
        .unwrap();
    assert_eq!(second.total, 5);
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.items[0].entry.content_id, titles[2]);
}
