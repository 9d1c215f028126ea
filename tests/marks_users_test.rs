//! Mark and User Store Integration Tests

mod common;

use common::{user_json, Harness, TOKEN};
use langate_console::models::{EditableMark, GameMarks, PageRequest, UserPatch, UserRole};
use langate_console::{MarkStore, UserStore};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn marks_json() -> serde_json::Value {
    json!([
        {"name": "vpn0", "value": 100, "priority": 0.9, "devices": 40, "whitelisted": 2},
        {"name": "vpn1", "value": 101, "priority": 0.1, "devices": 3, "whitelisted": 0}
    ])
}

#[tokio::test]
async fn test_fetch_marks() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/network/marks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(marks_json()))
        .mount(&h.server)
        .await;

    let marks = MarkStore::new(h.client.clone(), h.notifier())
        .fetch_marks()
        .await
        .unwrap();
    assert_eq!(marks.len(), 2);
    assert_eq!(marks[0].devices, 40);
    assert_eq!(marks[1].editable().value, 101);
}

#[tokio::test]
async fn test_patch_marks_sends_editable_fields() {
    let h = Harness::start().await;
    h.mount_csrf(1).await;
    Mock::given(method("PATCH"))
        .and(path("/network/marks/"))
        .and(header("X-CSRFToken", TOKEN))
        .and(body_json(json!([
            {"name": "vpn0", "value": 100, "priority": 0.5},
            {"name": "vpn1", "value": 101, "priority": 0.5}
        ])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"name": "vpn0", "value": 100, "priority": 0.5},
            {"name": "vpn1", "value": 101, "priority": 0.5}
        ])))
        .expect(1)
        .mount(&h.server)
        .await;

    let edit = vec![
        EditableMark {
            name: "vpn0".to_string(),
            value: 100,
            priority: 0.5,
        },
        EditableMark {
            name: "vpn1".to_string(),
            value: 101,
            priority: 0.5,
        },
    ];
    let stored = MarkStore::new(h.client.clone(), h.notifier())
        .patch_marks(&edit)
        .await
        .unwrap();
    // Aggregates default to zero when the backend omits them
    assert_eq!(stored[0].devices, 0);
}

#[tokio::test]
async fn test_patch_marks_rejects_duplicates_locally() {
    let h = Harness::start().await;
    h.mount_csrf(0).await;

    let dup = vec![
        EditableMark {
            name: "a".to_string(),
            value: 1,
            priority: 1.0,
        },
        EditableMark {
            name: "b".to_string(),
            value: 1,
            priority: 1.0,
        },
    ];
    let store = MarkStore::new(h.client.clone(), h.notifier());
    assert!(store.patch_marks(&dup).await.is_none());
    assert!(store.patch_marks(&[]).await.is_none());
    assert_eq!(h.queue.errors().len(), 2);
}

#[tokio::test]
async fn test_move_and_spread() {
    let h = Harness::start().await;
    h.mount_csrf(3).await;
    Mock::given(method("POST"))
        .and(path("/network/mark/100/move/101/"))
        .and(header("X-CSRFToken", TOKEN))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/network/mark/100/spread/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/network/mark/5/move/6/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid mark"})))
        .mount(&h.server)
        .await;

    let store = MarkStore::new(h.client.clone(), h.notifier());
    assert!(store.move_mark(100, 101).await);
    assert!(store.spread_mark(100).await);
    assert!(!store.move_mark(5, 6).await);
    assert_eq!(h.queue.errors(), vec!["Invalid mark".to_string()]);
}

#[tokio::test]
async fn test_game_marks() {
    let h = Harness::start().await;
    h.mount_csrf(1).await;
    Mock::given(method("GET"))
        .and(path("/network/games/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lol": [100, 101], "cs2": [101]})))
        .mount(&h.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/network/games/"))
        .and(body_json(json!({"cs2": [100], "lol": [100, 101]})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&h.server)
        .await;

    let store = MarkStore::new(h.client.clone(), h.notifier());
    let mut games: GameMarks = store.fetch_game_marks().await.unwrap();
    assert_eq!(games["cs2"], vec![101]);

    games.insert("cs2".to_string(), vec![100]);
    assert!(store.patch_game_marks(&games).await);
}

#[tokio::test]
async fn test_users_listing_and_edit() {
    let h = Harness::start().await;
    h.mount_csrf(1).await;
    Mock::given(method("GET"))
        .and(path("/user/users/"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 21, "next": null, "previous": null,
            "results": [user_json("player"), user_json("guest")]
        })))
        .mount(&h.server)
        .await;
    let mut updated = user_json("manager");
    updated["max_device_nb"] = json!(5);
    Mock::given(method("PATCH"))
        .and(path("/user/users/7/"))
        .and(body_json(json!({"role": "manager", "max_device_nb": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&h.server)
        .await;

    let store = UserStore::new(h.client.clone(), h.notifier());
    let page = store.fetch_users(PageRequest::new(3, 10)).await.unwrap();
    assert_eq!(page.results[1].role, UserRole::Guest);

    let patch = UserPatch {
        role: Some(UserRole::Manager),
        max_device_nb: Some(5),
        ..Default::default()
    };
    let user = store.edit_user(7, &patch).await.unwrap();
    assert_eq!(user.role, UserRole::Manager);
    assert_eq!(user.max_device_nb, 5);

    // Empty patch is refused before any request
    assert!(store.edit_user(7, &UserPatch::default()).await.is_none());
}

#[tokio::test]
async fn test_delete_and_password() {
    let h = Harness::start().await;
    h.mount_csrf(2).await;
    Mock::given(method("DELETE"))
        .and(path("/user/users/8/"))
        .and(header("X-CSRFToken", TOKEN))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/user/change-password/8/"))
        .and(body_json(json!({"password": "correct horse"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    let store = UserStore::new(h.client.clone(), h.notifier());
    assert!(!store.change_password(8, "short").await);
    assert!(store.change_password(8, "correct horse").await);
    assert!(store.delete_user(8).await);
    assert_eq!(h.queue.errors().len(), 1);
}
