use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use chrono::NaiveDate;
use pacto_core::TermCoordinator;
use pacto_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

async fn app(today: NaiveDate) -> Router {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  let coordinator = TermCoordinator::new(Arc::new(store)).with_today(today);
  api_router(AppState {
    coordinator:    Arc::new(coordinator),
    horizon_months: 12,
  })
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(json) => builder
      .header("content-type", "application/json")
      .body(Body::from(json.to_string())),
    None => builder.body(Body::empty()),
  }
  .unwrap();

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn commitment(app: &Router, name: &str, flow: &str) -> String {
  let (status, body) = send(
    app,
    "POST",
    "/commitments",
    Some(json!({ "name": name, "flow": flow })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body["commitment_id"].as_str().unwrap().to_string()
}

fn monthly(from: &str, amount: &str) -> Value {
  json!({
    "effective_from":    from,
    "frequency":         "monthly",
    "due_day_of_month":  1,
    "amount_original":   amount,
    "currency_original": "CLP",
    "fx_rate_to_base":   "1",
  })
}

// ─── Commitments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn commitments_are_created_fetched_and_deleted() {
  let app = app(date(2024, 3, 1)).await;
  let id = commitment(&app, "Rent", "expense").await;

  let (status, body) = send(&app, "GET", &format!("/commitments/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Rent");

  let (status, list) = send(&app, "GET", "/commitments", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 1);

  let (status, _) = send(&app, "DELETE", &format!("/commitments/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, body) = send(&app, "GET", &format!("/commitments/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn link_rejects_self_and_unknown_partner() {
  let app = app(date(2024, 3, 1)).await;
  let a = commitment(&app, "Rent paid", "expense").await;
  let b = commitment(&app, "Rent received", "income").await;
  let uri = format!("/commitments/{a}/link");

  let (status, _) = send(&app, "PUT", &uri, Some(json!({ "partner": a }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let unknown = uuid::Uuid::new_v4();
  let (status, _) = send(&app, "PUT", &uri, Some(json!({ "partner": unknown }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = send(&app, "PUT", &uri, Some(json!({ "partner": b }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["linked_commitment_id"], b.as_str());
}

// ─── Terms ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_needing_confirmation_answers_409_then_applies() {
  let app = app(date(2024, 3, 1)).await;
  let id = commitment(&app, "Rent", "expense").await;

  let (status, created) = send(
    &app,
    "POST",
    &format!("/commitments/{id}/terms"),
    Some(monthly("2024-01-01", "1000")),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["kind"], "created");
  let term_id = created["term"]["term_id"].as_str().unwrap().to_string();

  let (status, _) = send(
    &app,
    "POST",
    &format!("/commitments/{id}/payments"),
    Some(json!({
      "period":            "2024-05",
      "amount_original":   "1000",
      "currency_original": "CLP",
      "amount_in_base":    "1000",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let patch = json!({ "effective_until": "2024-04-30" });
  let (status, body) = send(&app, "PATCH", &format!("/terms/{term_id}"), Some(patch.clone())).await;
  assert_eq!(status, StatusCode::CONFLICT);
  let reasons: Vec<&str> = body["reasons"]
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["reason"].as_str().unwrap())
    .collect();
  assert_eq!(reasons, ["pending_payments_dropped", "end_date_defined"]);
  assert_eq!(body["messages"].as_array().unwrap().len(), 2);

  let (status, body) = send(
    &app,
    "PATCH",
    &format!("/terms/{term_id}?confirm=true"),
    Some(patch),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["kind"], "updated");
  assert_eq!(body["term"]["effective_until"], "2024-04-30");
  assert_eq!(body["dropped_payments"].as_array().unwrap().len(), 1);

  let (_, payments) = send(&app, "GET", &format!("/commitments/{id}/payments"), None).await;
  assert!(payments.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn validation_errors_answer_422_and_unknown_terms_404() {
  let app = app(date(2024, 3, 1)).await;
  let id = commitment(&app, "Gym", "expense").await;
  let mut first = monthly("2024-01-01", "1000");
  first["effective_until"] = json!("2024-05-31");
  send(&app, "POST", &format!("/commitments/{id}/terms"), Some(first)).await;

  let mut overlapping = monthly("2024-03-01", "900");
  overlapping["effective_until"] = json!("2024-08-31");
  let (status, body) = send(
    &app,
    "POST",
    &format!("/commitments/{id}/terms?confirm=true"),
    Some(overlapping),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "overlaps term v1 (2024-01 to 2024-05)");

  let (status, _) = send(
    &app,
    "POST",
    &format!("/commitments/{id}/terms"),
    Some(monthly("2024-06-01", "0")),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let unknown = uuid::Uuid::new_v4();
  let (status, _) = send(
    &app,
    "PATCH",
    &format!("/terms/{unknown}"),
    Some(json!({ "due_day_of_month": 5 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schedule_and_suggestion_follow_the_terms() {
  let app = app(date(2024, 3, 1)).await;
  let id = commitment(&app, "Rent", "expense").await;

  let (_, suggestion) = send(&app, "GET", &format!("/commitments/{id}/terms/suggestion"), None).await;
  assert_eq!(suggestion, json!({ "month": "2024-03", "scenario": "normal" }));

  send(
    &app,
    "POST",
    &format!("/commitments/{id}/terms"),
    Some(monthly("2024-01-01", "1000")),
  )
  .await;

  let (status, schedules) = send(
    &app,
    "GET",
    &format!("/commitments/{id}/schedule?horizon=2024-06"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let periods = schedules[0]["periods"].as_array().unwrap();
  assert_eq!(periods.len(), 6);
  assert_eq!(periods[0]["status"]["status"], "overdue");
  assert_eq!(periods[2]["status"]["status"], "pending");

  let (_, suggestion) = send(&app, "GET", &format!("/commitments/{id}/terms/suggestion"), None).await;
  assert_eq!(suggestion["scenario"], "will_close_active");
}

#[tokio::test]
async fn created_term_can_be_balanced_from_its_installments() {
  let app = app(date(2024, 1, 1)).await;
  let id = commitment(&app, "Laptop", "expense").await;
  let mut params = monthly("2024-01-15", "1200000");
  params["installments_count"] = json!(12);
  params["is_divided_amount"] = json!(true);

  let (status, created) = send(
    &app,
    "POST",
    &format!("/commitments/{id}/terms?last_edited=installments"),
    Some(params),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["term"]["effective_until"], "2025-01-31");
}

#[tokio::test]
async fn delete_with_reopen_previous_restores_continuity() {
  let app = app(date(2024, 3, 1)).await;
  let id = commitment(&app, "Rent", "expense").await;
  let terms_uri = format!("/commitments/{id}/terms");
  send(&app, "POST", &terms_uri, Some(monthly("2024-01-01", "1000"))).await;
  let (_, second) = send(&app, "POST", &terms_uri, Some(monthly("2024-06-01", "1200"))).await;
  let v2 = second["term"]["term_id"].as_str().unwrap().to_string();

  let (status, outcome) = send(
    &app,
    "DELETE",
    &format!("/terms/{v2}?reopen_previous=true"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(outcome["reopened"]["version"], 1);
  assert_eq!(outcome["reopened"]["effective_until"], Value::Null);

  let (_, terms) = send(&app, "GET", &terms_uri, None).await;
  assert_eq!(terms.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn pause_and_resume_round_trip() {
  let app = app(date(2024, 3, 10)).await;
  let id = commitment(&app, "Gym", "expense").await;
  let (_, created) = send(
    &app,
    "POST",
    &format!("/commitments/{id}/terms"),
    Some(monthly("2024-01-01", "1000")),
  )
  .await;
  let term_id = created["term"]["term_id"].as_str().unwrap().to_string();

  let (status, paused) = send(
    &app,
    "POST",
    &format!("/terms/{term_id}/pause"),
    Some(json!({ "last_active": "2024-05" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(paused["term"]["effective_until"], "2024-05-31");

  let (_, proposal) = send(&app, "GET", &format!("/terms/{term_id}/resume"), None).await;
  assert_eq!(proposal["effective_from"], "2024-06-01");

  let (status, resumed) = send(&app, "POST", &format!("/terms/{term_id}/resume"), None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(resumed["kind"], "extended");
}

// ─── Calculations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn balance_derives_the_installment_count() {
  let app = app(date(2024, 1, 1)).await;
  let mut params = monthly("2024-01-01", "100");
  params["effective_until"] = json!("2024-12-31");
  params["installments_count"] = json!(1);

  let (status, body) = send(
    &app,
    "POST",
    "/balance",
    Some(json!({ "params": params, "last_edited": "end_date" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["params"]["installments_count"], 12);
  assert_eq!(
    body["duration_mode"],
    json!({ "mode": "installments_and_date", "installments": 12 })
  );
}

#[tokio::test]
async fn totals_net_linked_commitments() {
  let app = app(date(2024, 1, 1)).await;
  let paid = commitment(&app, "Rent paid", "expense").await;
  let received = commitment(&app, "Rent received", "income").await;
  for (id, amount) in [(&paid, "800"), (&received, "500")] {
    send(
      &app,
      "POST",
      &format!("/commitments/{id}/terms"),
      Some(monthly("2024-01-01", amount)),
    )
    .await;
  }
  send(
    &app,
    "PUT",
    &format!("/commitments/{paid}/link"),
    Some(json!({ "partner": received })),
  )
  .await;

  let (status, totals) = send(&app, "GET", "/totals?period=2024-03", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    totals,
    json!([{ "category_id": null, "flow": "expense", "total": "300" }])
  );
}
