#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};
use uuid::Uuid;

use common::{Harness, ORIGIN, bearer};

fn post(uri: &str, user: Uuid, body: Value) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .insert_header(bearer(user))
        .insert_header(("Origin", ORIGIN))
        .set_json(body)
}

fn profile(first: &str, last: &str, email: &str) -> Value {
    json!({ "first_name": first, "last_name": last, "email": email })
}

#[actix_web::test]
async fn send_by_email_then_read() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let req = TestRequest::put()
        .uri("/api/patient/personal-info/profile")
        .insert_header(bearer(bob))
        .insert_header(("Origin", ORIGIN))
        .set_json(profile("Bob", "Dlamini", "bob@clinic.test"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let message = json!({
        "to": "BOB@clinic.test",
        "subject": "Repeat script",
        "body": "Please renew",
        "context_type": "prescription",
        "context_id": "rx-1"
    });
    let resp = test::call_service(&app, post("/api/comm/send", alice, message).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let sent: Value = test::read_body_json(resp).await;
    assert_eq!(sent["ok"], true);
    let id = sent["id"].as_str().unwrap().to_owned();

    let req = TestRequest::get().uri("/api/comm/unread-count").insert_header(bearer(bob)).to_request();
    let count: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(count, json!({ "count": 1 }));

    let req = TestRequest::get().uri("/api/comm/inbox").insert_header(bearer(bob)).to_request();
    let inbox: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(inbox["total"], 1);
    assert_eq!(inbox["items"][0]["comm_type"], "message");
    assert_eq!(inbox["items"][0]["meta"], json!({ "context_type": "prescription", "context_id": "rx-1" }));

    let resp = test::call_service(&app, post(&format!("/api/comm/read/{id}"), alice, json!({})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(&app, post(&format!("/api/comm/read/{id}"), bob, json!({})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let read: Value = test::read_body_json(resp).await;
    assert_eq!(read["ok"], true);
    assert_eq!(read["item"]["status"], "read");
    assert!(!read["item"]["read_at"].is_null());

    let req = TestRequest::get().uri("/api/comm/unread-count").insert_header(bearer(bob)).to_request();
    let count: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(count["count"], 0);
}

#[actix_web::test]
async fn unknown_email_recipient_is_not_found() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let req = post("/api/comm/send", Uuid::new_v4(), json!({ "to": "nobody@clinic.test", "body": "hi" }));
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Recipient not found");
}

#[actix_web::test]
async fn unread_count_is_zero_without_a_session() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let req = TestRequest::get().uri("/api/comm/unread-count").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "count": 0 }));
}

#[actix_web::test]
async fn thread_holds_both_directions() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    for (from, to) in [(alice, bob), (bob, alice), (carol, alice)] {
        let req = post("/api/comm/send", from, json!({ "to": to.to_string(), "body": "hello" }));
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::CREATED);
    }

    let req = TestRequest::get()
        .uri(&format!("/api/comm/with/{bob}"))
        .insert_header(bearer(alice))
        .to_request();
    let thread: Value = test::call_and_read_body_json(&app, req).await;
    let items = thread["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item["user_from"] != json!(carol.to_string())));

    let req = TestRequest::get()
        .uri("/api/comm/with/not-a-user")
        .insert_header(bearer(alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn recipient_search_needs_two_characters() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let searcher = Uuid::new_v4();

    for (user, first, last, email) in [
        (Uuid::new_v4(), "Naledi", "Khumalo", "naledi@clinic.test"),
        (Uuid::new_v4(), "Nathan", "Adams", "nathan@clinic.test"),
        (Uuid::new_v4(), "Zola", "Mbeki", "zola@clinic.test"),
    ] {
        let req = TestRequest::put()
            .uri("/api/patient/personal-info/profile")
            .insert_header(bearer(user))
            .insert_header(("Origin", ORIGIN))
            .set_json(profile(first, last, email))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let req = TestRequest::get()
        .uri("/api/comm/recipients?q=n")
        .insert_header(bearer(searcher))
        .to_request();
    let found: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found, json!({ "items": [] }));

    let req = TestRequest::get()
        .uri("/api/comm/recipients?q=NA")
        .insert_header(bearer(searcher))
        .to_request();
    let found: Value = test::call_and_read_body_json(&app, req).await;
    let items = found["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["last_name"], "Adams");
    assert_eq!(items[1]["nickname"], Value::Null);
}
