mod common;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{Value, json};

use common::{OTHER_ACCOUNT, test_app};

fn retainer() -> Value {
    json!({
        "client_id": "client-1",
        "cadence": "monthly",
        "start_date": Utc::now().date_naive(),
        "tax_rate": "10",
        "notes": "Monthly retainer",
        "items": [
            {"description": "Retainer", "quantity": 1, "unit_price": "1500.00"},
            {"description": "Hosting", "quantity": 1, "unit_price": 49.99}
        ]
    })
}

#[tokio::test]
async fn template_lifecycle() {
    let app = test_app().await;

    let (status, template) = app
        .as_acme("POST", "/recurring-invoices", Some(retainer()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(template["active"], true);
    assert_eq!(template["cadence"], "monthly");
    assert_eq!(template["items"].as_array().unwrap().len(), 2);
    let id = template["id"].as_str().unwrap().to_string();

    let (status, paused) = app
        .as_acme("POST", &format!("/recurring-invoices/{id}/pause"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paused["active"], false);

    let (status, body) = app
        .as_acme("POST", &format!("/recurring-invoices/{id}/generate"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "template_inactive_error");

    let (status, resumed) = app
        .as_acme("POST", &format!("/recurring-invoices/{id}/resume"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resumed["active"], true);

    let (status, invoice) = app
        .as_acme("POST", &format!("/recurring-invoices/{id}/generate"), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["recurring_template_id"], id.as_str());
    assert_eq!(invoice["total"], "1704.99");
    assert_eq!(invoice["notes"], "Monthly retainer");

    let (_, template) = app
        .as_acme("GET", &format!("/recurring-invoices/{id}"), None)
        .await;
    assert_ne!(template["next_generation_date"], template["start_date"]);

    let (status, _) = app
        .as_acme("DELETE", &format!("/recurring-invoices/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .as_acme("GET", &format!("/recurring-invoices/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn process_due_generates_once_per_day() {
    let app = test_app().await;
    app.as_acme("POST", "/recurring-invoices", Some(retainer()))
        .await;

    let (status, report) = app
        .as_acme("POST", "/recurring-invoices/process-due", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["processed"], 1);
    assert_eq!(report["generated"], 1);

    let (_, report) = app
        .as_acme("POST", "/recurring-invoices/process-due", None)
        .await;
    assert_eq!(report["processed"], 0);

    let (_, list) = app.as_acme("GET", "/invoices", None).await;
    assert_eq!(list["invoices"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn patch_updates_template() {
    let app = test_app().await;
    let (_, template) = app
        .as_acme("POST", "/recurring-invoices", Some(retainer()))
        .await;
    let uri = format!("/recurring-invoices/{}", template["id"].as_str().unwrap());

    let (status, updated) = app
        .as_acme(
            "PATCH",
            &uri,
            Some(json!({
                "cadence": "quarterly",
                "notes": null,
                "items": [{"description": "Audit", "quantity": 1, "unit_price": 900}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["cadence"], "quarterly");
    assert!(updated["notes"].is_null());
    assert_eq!(updated["items"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .as_acme("PATCH", &uri, Some(json!({ "end_date": "2000-01-01" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn bulk_templates_and_listing() {
    let app = test_app().await;
    let mut foreign = retainer();
    foreign["client_id"] = json!("client-9");

    let (status, body) = app
        .as_acme(
            "POST",
            "/recurring-invoices/bulk",
            Some(json!({ "templates": [retainer(), foreign, retainer()] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][1]["success"], false);

    let (_, list) = app.as_acme("GET", "/recurring-invoices", None).await;
    assert_eq!(list["templates"].as_array().unwrap().len(), 2);

    let (_, other) = app
        .call("GET", "/recurring-invoices", Some(OTHER_ACCOUNT), None)
        .await;
    assert_eq!(other["templates"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn malformed_bulk_template_fails_alone() {
    let app = test_app().await;
    let mut hourly = retainer();
    hourly["cadence"] = json!("hourly");

    let (status, body) = app
        .as_acme(
            "POST",
            "/recurring-invoices/bulk",
            Some(json!({ "templates": [retainer(), hourly, retainer()] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][1]["index"], 1);
    assert_eq!(body["results"][1]["success"], false);
    assert_eq!(body["results"][2]["index"], 2);
    assert_eq!(body["results"][2]["success"], true);

    let (status, body) = app
        .as_acme(
            "POST",
            "/recurring-invoices/bulk",
            Some(json!({ "templates": [{ "cadence": "monthly" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 0);
    assert_eq!(body["failed"], 1);

    let (_, list) = app.as_acme("GET", "/recurring-invoices", None).await;
    assert_eq!(list["templates"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_template_body_is_a_validation_error() {
    let app = test_app().await;
    let mut payload = retainer();
    payload["start_date"] = json!("next tuesday");

    let (status, body) = app
        .as_acme("POST", "/recurring-invoices", Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}
