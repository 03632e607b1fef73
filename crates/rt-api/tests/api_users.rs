mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use rt_api::configure_routes;
use serde_json::{json, Value};

fn user(id: &str, current: bool) -> Value {
    json!({
        "id": id,
        "name": id,
        "real_name": id.to_uppercase(),
        "is_active": true,
        "is_admin": id == "a",
        "current": current,
        "engineer": true,
        "attuid": format!("{id}1234")
    })
}

fn ids(users: &[Value]) -> Vec<&str> {
    users.iter().map(|u| u["id"].as_str().unwrap()).collect()
}

#[actix_web::test]
async fn test_rotation_round_robin() {
    let app = test::init_service(App::new().app_data(common::state().await).configure(configure_routes)).await;

    for body in [user("c", false), user("a", true), user("b", false)] {
        let req = test::TestRequest::post().uri("/api/user").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get().uri("/api/users/current").to_request();
    let current: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(current["id"], "a");

    for expected in ["b", "c", "a"] {
        let req = test::TestRequest::get().uri("/api/users/next").to_request();
        let next: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(next["id"], expected);
        assert_eq!(next["current"], true);
    }

    let req = test::TestRequest::get().uri("/api/users").to_request();
    let all: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&all), ["a", "b", "c"]);
    let flagged: Vec<&Value> = all.iter().filter(|u| u["current"] == true).collect();
    assert_eq!(flagged.len(), 1);
}

#[actix_web::test]
async fn test_next_without_current_is_no_content() {
    let app = test::init_service(App::new().app_data(common::state().await).configure(configure_routes)).await;

    let req = test::TestRequest::post().uri("/api/user").set_json(user("a", false)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/users/next").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri("/api/users/current").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_current_user_is_protected() {
    let app = test::init_service(App::new().app_data(common::state().await).configure(configure_routes)).await;

    for body in [user("a", true), user("b", false)] {
        let req = test::TestRequest::post().uri("/api/user").set_json(body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::delete().uri("/api/user/a").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().starts_with("This user is current"));

    let req = test::TestRequest::put().uri("/api/user/blacklist/a").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get().uri("/api/user/a").to_request();
    let a: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(a["is_active"], true);
    assert_eq!(a["current"], true);

    let req = test::TestRequest::put().uri("/api/user/blacklist/b").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri("/api/users/blacklisted").to_request();
    let blacklisted: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&blacklisted), ["b"]);

    // With b blacklisted the rotation stays on a.
    let req = test::TestRequest::get().uri("/api/users/next").to_request();
    let next: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(next["id"], "a");

    let req = test::TestRequest::put().uri("/api/user/whitelist/b").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri("/api/users/active").to_request();
    let active: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&active), ["a", "b"]);

    let req = test::TestRequest::delete().uri("/api/user/b").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::delete().uri("/api/user/b").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_user_lookups() {
    let app = test::init_service(App::new().app_data(common::state().await).configure(configure_routes)).await;

    for body in [user("a", false), user("b", false)] {
        let req = test::TestRequest::post().uri("/api/user").set_json(body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }
    let req = test::TestRequest::post().uri("/api/user").set_json(user("a", false)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User with this uid already exists");

    let req = test::TestRequest::get().uri("/api/attuser/b1234").to_request();
    let b: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(b["id"], "b");

    let req = test::TestRequest::get().uri("/api/user/isadmin/a").to_request();
    let admin: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(admin, json!(true));
    let req = test::TestRequest::get().uri("/api/user/isadmin/b").to_request();
    let admin: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(admin, json!(false));

    let req = test::TestRequest::get().uri("/api/users/admins").to_request();
    let admins: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&admins), ["a"]);

    // Writing current=true moves the rotation slot.
    let req = test::TestRequest::put().uri("/api/user/b").set_json(user("b", true)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri("/api/users/current").to_request();
    let current: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(current["id"], "b");

    let req = test::TestRequest::get().uri("/api/user/zz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User not found");
}

#[actix_web::test]
async fn test_update_cannot_deactivate_current_user() {
    let app = test::init_service(App::new().app_data(common::state().await).configure(configure_routes)).await;

    for body in [user("a", true), user("b", false)] {
        let req = test::TestRequest::post().uri("/api/user").set_json(body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::put()
        .uri("/api/user/a")
        .set_json(json!({ "id": "a", "is_active": false, "engineer": true, "current": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().starts_with("This user is current"));

    let req = test::TestRequest::get().uri("/api/users/current").to_request();
    let current: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(current["id"], "a");
    assert_eq!(current["is_active"], true);
    assert_eq!(current["real_name"], "A");
}

#[actix_web::test]
async fn test_update_without_current_keeps_rotation() {
    let app = test::init_service(App::new().app_data(common::state().await).configure(configure_routes)).await;

    let req = test::TestRequest::post().uri("/api/user").set_json(user("a", true)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let mut edit = user("a", true);
    edit.as_object_mut().unwrap().remove("current");
    edit["real_name"] = json!("Alice");
    let req = test::TestRequest::put().uri("/api/user/a").set_json(edit).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri("/api/users/current").to_request();
    let current: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(current["id"], "a");
    assert_eq!(current["real_name"], "Alice");
    assert_eq!(current["current"], true);
}

#[actix_web::test]
async fn test_blacklist_by_get() {
    let app = test::init_service(App::new().app_data(common::state().await).configure(configure_routes)).await;

    for body in [user("a", true), user("b", false)] {
        let req = test::TestRequest::post().uri("/api/user").set_json(body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get().uri("/api/user/blacklist/b").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri("/api/user/blacklist/a").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    let req = test::TestRequest::get().uri("/api/users/blacklisted").to_request();
    let blacklisted: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&blacklisted), ["b"]);

    let req = test::TestRequest::get().uri("/api/user/whitelist/b").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri("/api/users/blacklisted").to_request();
    let blacklisted: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(blacklisted.is_empty());
}
