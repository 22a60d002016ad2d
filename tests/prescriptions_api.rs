#[macro_use]
mod common;

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};
use uuid::Uuid;

use medportal::models::Pharmacy;
use medportal::models::prescription::{QUEUE_PENDING, STATUS_ALLOCATED, STATUS_SUBMITTED};
use medportal::store::PrescriptionStore;

use common::{Harness, ORIGIN, PNG_DATA_URL, bearer};

const PRESCRIPTIONS: &str = "/api/patient/prescriptions";

fn pharmacy(name: &str, lat: f64, lon: f64) -> Pharmacy {
    Pharmacy {
        pharmacy_id: Uuid::new_v4(),
        name: name.to_owned(),
        latitude: Some(lat),
        longitude: Some(lon),
        is_active: true,
    }
}

fn post(uri: &str, user: Uuid, body: Value) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .insert_header(bearer(user))
        .insert_header(("Origin", ORIGIN))
        .set_json(body)
}

fn saved_body() -> Value {
    json!({
        "analysis": { "isPrescription": true, "medications": [] },
        "uploadedPath": "user/prescriptions/1_script.png",
        "sessionId": "scan_1_abcdefghi"
    })
}

#[actix_web::test]
async fn analyze_rejects_an_empty_image() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let req = post(
        &format!("{PRESCRIPTIONS}/analyze"),
        Uuid::new_v4(),
        json!({ "imageBase64": "", "fileName": "script.png", "fileType": "image/png" }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "imageBase64");
    assert!(harness.images.uploads.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn analyze_checks_the_data_url() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();
    let uri = format!("{PRESCRIPTIONS}/analyze");

    let req = post(
        &uri,
        user,
        json!({ "imageBase64": "data:image/gif;base64,R0lGODlh", "fileName": "a.gif", "fileType": "image/png" }),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let req = post(
        &uri,
        user,
        json!({ "imageBase64": PNG_DATA_URL, "fileName": "a.png", "fileType": "image/jpeg" }),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn analyze_returns_the_extraction_and_audits_it() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();

    let req = post(
        &format!("{PRESCRIPTIONS}/analyze"),
        user,
        json!({ "imageBase64": PNG_DATA_URL, "fileName": "my script.png", "fileType": "image/png" }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["isPrescription"], true);
    assert!(body["data"]["overallConfidence"].as_f64().unwrap() > 0.0);
    assert_eq!(body["data"]["medications"][0]["name"], "Amoxicillin");
    assert_eq!(body["cost"], 0.008);
    assert!(body["sessionId"].as_str().unwrap().starts_with("scan_"));
    assert!(body.get("reason").is_none());

    let uploaded = body["uploadedPath"].as_str().unwrap();
    assert!(uploaded.starts_with(&format!("{user}/prescriptions/")));
    assert!(uploaded.ends_with("_my_script.png"));
    let uploads = harness.images.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].2, "image/png");

    let audit = harness.memory.prescriptions.audit_log().unwrap();
    assert_eq!(audit.len(), 1);
    assert!(audit[0].success);
    assert_eq!(audit[0].user_id, user);
    assert_eq!(audit[0].metadata["session_id"], body["sessionId"]);
}

#[actix_web::test]
async fn analyze_failure_reports_reason() {
    let harness = Harness::with_vision(None);
    let app = portal_app!(harness);

    let req = post(
        &format!("{PRESCRIPTIONS}/analyze"),
        Uuid::new_v4(),
        json!({ "imageBase64": PNG_DATA_URL, "fileName": "script.png", "fileType": "image/png" }),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Analysis failed");
    assert_eq!(body["reason"], "OpenAI API key not configured");

    let audit = harness.memory.prescriptions.audit_log().unwrap();
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].success);
    assert!(harness.images.uploads.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn submit_succeeds_even_when_allocation_fails() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();

    let resp = test::call_service(&app, post(PRESCRIPTIONS, user, saved_body()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let saved: Value = test::read_body_json(resp).await;
    assert_eq!(saved["status"], "ai-analysed-saved");
    let id = saved["prescription_id"].as_str().unwrap().to_owned();

    let submit = post(&format!("{PRESCRIPTIONS}/{id}/submit"), user, json!({}));
    let resp = test::call_service(&app, submit.to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], STATUS_SUBMITTED);

    actix_web::rt::time::sleep(Duration::from_millis(50)).await;
    let calls = harness.notifier.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.to_string(), id);
    assert!(calls[0].1.as_deref().unwrap().starts_with("Bearer "));
}

#[actix_web::test]
async fn submit_reports_bad_ids_and_foreign_rows() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let owner = Uuid::new_v4();

    let submit = post(&format!("{PRESCRIPTIONS}/nope/submit"), owner, json!({}));
    let resp = test::call_service(&app, submit.to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid id");

    let saved: Value = test::call_and_read_body_json(&app, post(PRESCRIPTIONS, owner, saved_body()).to_request()).await;
    let id = saved["prescription_id"].as_str().unwrap();
    let resp = test::call_service(
        &app,
        post(&format!("{PRESCRIPTIONS}/{id}/submit"), Uuid::new_v4(), json!({})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Update failed");
    assert!(harness.notifier.calls.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn allocate_queues_the_nearest_pharmacies() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();

    let saved: Value = test::call_and_read_body_json(&app, post(PRESCRIPTIONS, user, saved_body()).to_request()).await;
    let id = saved["prescription_id"].as_str().unwrap().to_owned();
    let allocate = format!("{PRESCRIPTIONS}/{id}/allocate");

    let resp = test::call_service(&app, post(&allocate, user, json!({})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Patient location not set. Please update your profile location first.");

    let req = TestRequest::put()
        .uri("/api/patient/personal-info/profile")
        .insert_header(bearer(user))
        .insert_header(("Origin", ORIGIN))
        .set_json(json!({
            "first_name": "Thandi",
            "last_name": "Mokoena",
            "latitude": -33.9249,
            "longitude": 18.4241,
            "max_pharmacy_distance_km": 50
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let resp = test::call_service(&app, post(&allocate, user, json!({})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No pharmacies available for allocation");

    let pharmacies = &harness.memory.pharmacies;
    pharmacies.add(pharmacy("Claremont", -34.05, 18.55)).unwrap();
    pharmacies.add(pharmacy("Gardens", -33.93, 18.43)).unwrap();
    pharmacies.add(pharmacy("Johannesburg", -26.2041, 28.0473)).unwrap();

    let resp = test::call_service(&app, post(&allocate, user, json!({})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Successfully allocated to pharmacies");
    assert_eq!(body["pharmacies_count"], 2);
    assert_eq!(body["pharmacies"][0], json!({ "name": "Gardens", "distance_km": "0.8" }));
    assert_eq!(body["pharmacies"][1], json!({ "name": "Claremont", "distance_km": "18.1" }));

    let queue = harness.memory.prescriptions.queue().unwrap();
    assert_eq!(queue.len(), 2);
    assert!(queue.iter().all(|entry| entry.status == QUEUE_PENDING && entry.patient_profile_id == user));

    let id = Uuid::parse_str(&id).unwrap();
    let row = harness.memory.prescriptions.get(user, id).unwrap().unwrap();
    assert_eq!(row.status, STATUS_ALLOCATED);
    assert!(row.allocated_at.is_some());
}

#[actix_web::test]
async fn allocate_requires_an_owned_prescription() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let resp = test::call_service(
        &app,
        post(&format!("{PRESCRIPTIONS}/{}/allocate", Uuid::new_v4()), Uuid::new_v4(), json!({})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Prescription not found");
}

#[actix_web::test]
async fn list_is_newest_first_and_filters_by_status() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();

    let first: Value = test::call_and_read_body_json(&app, post(PRESCRIPTIONS, user, saved_body()).to_request()).await;
    actix_web::rt::time::sleep(Duration::from_millis(5)).await;
    let second: Value = test::call_and_read_body_json(&app, post(PRESCRIPTIONS, user, saved_body()).to_request()).await;
    let id = first["prescription_id"].as_str().unwrap();
    test::call_service(&app, post(&format!("{PRESCRIPTIONS}/{id}/submit"), user, json!({})).to_request()).await;

    let req = TestRequest::get().uri(PRESCRIPTIONS).insert_header(bearer(user)).to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["data"][0]["prescription_id"], second["prescription_id"]);

    let req = TestRequest::get()
        .uri(&format!("{PRESCRIPTIONS}?status={STATUS_SUBMITTED}"))
        .insert_header(bearer(user))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["prescription_id"], first["prescription_id"]);
}
