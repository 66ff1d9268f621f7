mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use common::{money, TestApp};

async fn create_activity(app: &TestApp, starts_in: Duration, capacity: u32, fee: u32) -> Result<Value> {
    let start = Utc::now() + starts_in;
    let res = app
        .post(
            "/api/activities",
            &app.principal(),
            json!({
                "title": "绘本共读",
                "type": "阅读",
                "startTime": start.to_rfc3339(),
                "endTime": (start + Duration::hours(2)).to_rfc3339(),
                "capacity": capacity,
                "fee": fee
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    Ok(res.data().clone())
}

fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().unwrap_or_default()
}

#[tokio::test]
async fn parent_registers_own_child_once() -> Result<()> {
    let app = TestApp::spawn().await?;
    let uri = format!("/api/activities/{}/register", app.ids.activity);

    let res = app.post(&uri, &app.parent(), json!({ "studentId": app.ids.student })).await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.message(), "Registration successful");
    assert_eq!(res.data()["status"], "已报名");
    assert_eq!(money(&res.data()["fee"]), Decimal::from(50));

    let again = app.post(&uri, &app.parent(), json!({ "studentId": app.ids.student })).await?;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.error_code(), "BUSINESS_RULE_VIOLATION");
    assert_eq!(again.message(), "Student is already registered for this activity");

    let activity = app.get(&format!("/api/activities/{}", app.ids.activity), &app.parent()).await?;
    assert_eq!(activity.data()["registeredCount"], 1);
    Ok(())
}

#[tokio::test]
async fn parent_cannot_register_someone_elses_child() -> Result<()> {
    let app = TestApp::spawn().await?;
    let uri = format!("/api/activities/{}/register", app.ids.activity);

    let res = app.post(&uri, &app.parent(), json!({ "studentId": app.ids.other_student })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.error_code(), "ACCESS_DENIED");
    Ok(())
}

#[tokio::test]
async fn teachers_cannot_register_students() -> Result<()> {
    let app = TestApp::spawn().await?;
    let uri = format!("/api/activities/{}/register", app.ids.activity);

    let res = app.post(&uri, &app.teacher(), json!({ "studentId": app.ids.student })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.error_code(), "INSUFFICIENT_PERMISSIONS");
    Ok(())
}

#[tokio::test]
async fn full_activity_rejects_further_registrations() -> Result<()> {
    let app = TestApp::spawn().await?;
    let activity = create_activity(&app, Duration::days(5), 1, 0).await?;
    let uri = format!("/api/activities/{}/register", id_of(&activity));

    let first = app.post(&uri, &app.principal(), json!({ "studentId": app.ids.student })).await?;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.post(&uri, &app.principal(), json!({ "studentId": app.ids.other_student })).await?;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.message(), "Activity is at full capacity");
    Ok(())
}

#[tokio::test]
async fn expensive_activity_needs_approval_before_registration() -> Result<()> {
    let app = TestApp::spawn().await?;
    let activity = create_activity(&app, Duration::days(7), 10, 800).await?;
    assert_eq!(activity["status"], "待审核");
    let id = id_of(&activity);

    let early = app
        .post(&format!("/api/activities/{}/register", id), &app.parent(), json!({ "studentId": app.ids.student }))
        .await?;
    assert_eq!(early.status, StatusCode::BAD_REQUEST);

    let teacher_try = app.put(&format!("/api/activities/{}/approve", id), &app.teacher(), json!({})).await?;
    assert_eq!(teacher_try.status, StatusCode::FORBIDDEN);

    let approved = app.put(&format!("/api/activities/{}/approve", id), &app.principal(), json!({})).await?;
    assert_eq!(approved.status, StatusCode::OK, "{}", approved.body);
    assert_eq!(approved.data()["status"], "开放报名");

    let twice = app.put(&format!("/api/activities/{}/approve", id), &app.principal(), json!({})).await?;
    assert_eq!(twice.status, StatusCode::BAD_REQUEST);
    assert_eq!(twice.error_code(), "INVALID_STATUS_TRANSITION");

    let now_open = app
        .post(&format!("/api/activities/{}/register", id), &app.parent(), json!({ "studentId": app.ids.student }))
        .await?;
    assert_eq!(now_open.status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn fee_at_threshold_opens_immediately() -> Result<()> {
    let app = TestApp::spawn().await?;
    let activity = create_activity(&app, Duration::days(7), 10, 500).await?;
    assert_eq!(activity["status"], "开放报名");
    Ok(())
}

async fn cancel_quote(app: &TestApp, starts_in: Duration) -> Result<Value> {
    let activity = create_activity(app, starts_in, 10, 100).await?;
    let id = id_of(&activity);

    let registration = app
        .post(&format!("/api/activities/{}/register", id), &app.parent(), json!({ "studentId": app.ids.student }))
        .await?;
    assert_eq!(registration.status, StatusCode::CREATED, "{}", registration.body);

    let cancelled = app
        .post(
            &format!("/api/activities/{}/registrations/{}/cancel", id, id_of(registration.data())),
            &app.parent(),
            json!({}),
        )
        .await?;
    assert_eq!(cancelled.status, StatusCode::OK, "{}", cancelled.body);
    assert_eq!(cancelled.data()["status"], "已取消");
    Ok(cancelled.data().clone())
}

#[tokio::test]
async fn cancellation_fee_depends_on_time_to_start() -> Result<()> {
    let app = TestApp::spawn().await?;

    let late = cancel_quote(&app, Duration::hours(12)).await?;
    assert_eq!(money(&late["cancellationFee"]), Decimal::from(50));
    assert_eq!(money(&late["refund"]), Decimal::from(50));

    let soon = cancel_quote(&app, Duration::hours(48)).await?;
    assert_eq!(money(&soon["cancellationFee"]), Decimal::from(20));
    assert_eq!(money(&soon["refund"]), Decimal::from(80));

    let early = cancel_quote(&app, Duration::days(5)).await?;
    assert_eq!(money(&early["cancellationFee"]), Decimal::ZERO);
    assert_eq!(money(&early["refund"]), Decimal::from(100));
    Ok(())
}

#[tokio::test]
async fn cancelled_registration_frees_the_seat() -> Result<()> {
    let app = TestApp::spawn().await?;
    let activity = create_activity(&app, Duration::days(5), 1, 0).await?;
    let id = id_of(&activity);

    let first = app
        .post(&format!("/api/activities/{}/register", id), &app.parent(), json!({ "studentId": app.ids.student }))
        .await?;
    app.post(
        &format!("/api/activities/{}/registrations/{}/cancel", id, id_of(first.data())),
        &app.parent(),
        json!({}),
    )
    .await?;

    let other = app
        .post(&format!("/api/activities/{}/register", id), &app.other_parent(), json!({ "studentId": app.ids.other_student }))
        .await?;
    assert_eq!(other.status, StatusCode::CREATED, "{}", other.body);
    Ok(())
}

#[tokio::test]
async fn only_the_registering_family_may_cancel() -> Result<()> {
    let app = TestApp::spawn().await?;
    let uri = format!("/api/activities/{}/register", app.ids.activity);
    let registration = app.post(&uri, &app.parent(), json!({ "studentId": app.ids.student })).await?;

    let res = app
        .post(
            &format!("/api/activities/{}/registrations/{}/cancel", app.ids.activity, id_of(registration.data())),
            &app.other_parent(),
            json!({}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn cancelling_an_activity_refunds_everyone_and_closes_it() -> Result<()> {
    let app = TestApp::spawn().await?;
    let uri = format!("/api/activities/{}/register", app.ids.activity);
    app.post(&uri, &app.parent(), json!({ "studentId": app.ids.student })).await?;

    let res = app.delete(&format!("/api/activities/{}", app.ids.activity), &app.principal()).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["status"], "已取消");
    assert_eq!(res.data()["registeredCount"], 0);

    let closed = app.post(&uri, &app.other_parent(), json!({ "studentId": app.ids.other_student })).await?;
    assert_eq!(closed.status, StatusCode::BAD_REQUEST);
    assert_eq!(closed.message(), "Activity is not open for registration");

    let again = app.delete(&format!("/api/activities/{}", app.ids.activity), &app.principal()).await?;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn feedback_requires_registration_and_is_unique() -> Result<()> {
    let app = TestApp::spawn().await?;
    let uri = format!("/api/activities/{}/feedback", app.ids.activity);

    let stranger = app.post(&uri, &app.parent(), json!({ "rating": 5 })).await?;
    assert_eq!(stranger.status, StatusCode::BAD_REQUEST);

    app.post(
        &format!("/api/activities/{}/register", app.ids.activity),
        &app.parent(),
        json!({ "studentId": app.ids.student }),
    )
    .await?;

    let first = app.post(&uri, &app.parent(), json!({ "rating": 5, "comment": "孩子很开心" })).await?;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);

    let second = app.post(&uri, &app.parent(), json!({ "rating": 4 })).await?;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.error_code(), "DUPLICATE_ENTRY");

    let list = app.get(&uri, &app.teacher()).await?;
    assert_eq!(list.body["pagination"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn listing_filters_by_status() -> Result<()> {
    let app = TestApp::spawn().await?;
    create_activity(&app, Duration::days(9), 10, 900).await?;

    let pending = app.get("/api/activities?status=%E5%BE%85%E5%AE%A1%E6%A0%B8", &app.principal()).await?;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body["pagination"]["total"], 1);

    let bogus = app.get("/api/activities?status=whatever", &app.principal()).await?;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);
    Ok(())
}
