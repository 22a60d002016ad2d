#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};
use uuid::Uuid;

use common::{Harness, ORIGIN, bearer};

const ACTIVE: &str = "/api/patient/medications/active";
const HISTORY: &str = "/api/patient/medications/history";
const ADHERENCE: &str = "/api/patient/medications/adherence";

fn post(uri: &str, user: Uuid, body: Value) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .insert_header(bearer(user))
        .insert_header(("Origin", ORIGIN))
        .set_json(body)
}

#[actix_web::test]
async fn active_medications_default_to_active_and_filter_by_status() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();

    let metformin = json!({ "medication_name": "Metformin", "dosage": "500mg", "route": "oral" });
    let resp = test::call_service(&app, post(ACTIVE, user, metformin).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "active");
    assert_eq!(created["route"], "oral");

    let paused = json!({ "medication_name": "Atorvastatin", "status": "paused" });
    let resp = test::call_service(&app, post(ACTIVE, user, paused).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = TestRequest::get()
        .uri(&format!("{ACTIVE}?status=paused"))
        .insert_header(bearer(user))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["medication_name"], "Atorvastatin");

    let req = TestRequest::get()
        .uri(&format!("{ACTIVE}?status=forgotten"))
        .insert_header(bearer(user))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = TestRequest::get()
        .uri(&format!("{ACTIVE}/{}", created["medication_id"].as_str().unwrap()))
        .insert_header(bearer(Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Medication not found");
}

#[actix_web::test]
async fn discontinuing_a_medication_keeps_the_other_fields() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();

    let body = json!({
        "medication_name": "Warfarin",
        "prescriber": "Dr Naidoo",
        "start_date": "2024-01-10"
    });
    let req = post(ACTIVE, user, body).to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let path = format!("{ACTIVE}/{}", created["medication_id"].as_str().unwrap());

    let req = TestRequest::put()
        .uri(&path)
        .insert_header(bearer(user))
        .insert_header(("Origin", ORIGIN))
        .set_json(json!({ "status": "discontinued", "end_date": "2024-06-01" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["status"], "discontinued");
    assert_eq!(updated["end_date"], "2024-06-01");
    assert_eq!(updated["prescriber"], "Dr Naidoo");

    let req = TestRequest::get()
        .uri(&format!("{ACTIVE}?search=naidoo"))
        .insert_header(bearer(user))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 1);
}

#[actix_web::test]
async fn history_filters_by_effectiveness() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();

    for (name, effectiveness) in [("Amoxicillin", "effective"), ("Codeine", "adverse_reaction")] {
        let body = json!({
            "medication_name": name,
            "taken_period": "2 weeks",
            "effectiveness": effectiveness
        });
        let resp = test::call_service(&app, post(HISTORY, user, body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = TestRequest::get()
        .uri(&format!("{HISTORY}?effectiveness=adverse_reaction"))
        .insert_header(bearer(user))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["medication_name"], "Codeine");

    let req = post(HISTORY, user, json!({ "reason": "Pain" })).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(harness.memory.medication_history.snapshot().unwrap().len(), 2);
}

#[actix_web::test]
async fn adherence_requires_a_status() {
    let harness = Harness::new();
    let app = portal_app!(harness);
    let user = Uuid::new_v4();

    let missing = json!({ "medication_name": "Metformin" });
    let resp = test::call_service(&app, post(ADHERENCE, user, missing).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "status");

    let dose = json!({
        "medication_name": "Metformin",
        "scheduled_time": "2024-05-01T08:00:00+02:00",
        "status": "taken_late"
    });
    let resp = test::call_service(&app, post(ADHERENCE, user, dose).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "taken_late");
    assert_eq!(created["scheduled_time"], "2024-05-01T06:00:00Z");

    let req = TestRequest::delete()
        .uri(&format!("{ADHERENCE}/{}", created["adherence_id"].as_str().unwrap()))
        .insert_header(bearer(user))
        .insert_header(("Origin", ORIGIN))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = TestRequest::get().uri(ADHERENCE).insert_header(bearer(user)).to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 0);
}
