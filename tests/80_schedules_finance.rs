mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use common::{money, TestApp};

async fn schedule(app: &TestApp, teacher: i64, room: &str, start: DateTime<Utc>, hours: i64) -> Result<common::Reply> {
    app.post(
        "/api/schedules",
        &app.principal(),
        json!({
            "title": "音乐课",
            "teacherId": teacher,
            "room": room,
            "classId": app.ids.class,
            "startTime": start.to_rfc3339(),
            "endTime": (start + Duration::hours(hours)).to_rfc3339()
        }),
    )
    .await
}

fn monday_nine() -> DateTime<Utc> {
    Utc::now() + Duration::days(7)
}

#[tokio::test]
async fn overlapping_slot_for_same_teacher_is_a_conflict() -> Result<()> {
    let app = TestApp::spawn().await?;
    let t = monday_nine();

    let first = schedule(&app, app.ids.teacher, "101", t, 1).await?;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);

    let clash = schedule(&app, app.ids.teacher, "202", t + Duration::minutes(30), 1).await?;
    assert_eq!(clash.status, StatusCode::BAD_REQUEST);
    assert!(clash.message().starts_with("Schedule conflict"), "{}", clash.message());
    Ok(())
}

#[tokio::test]
async fn overlapping_slot_in_same_room_is_a_conflict() -> Result<()> {
    let app = TestApp::spawn().await?;
    let t = monday_nine();

    schedule(&app, app.ids.teacher, "101", t, 2).await?;
    let clash = schedule(&app, app.ids.other_teacher, "101", t + Duration::hours(1), 2).await?;
    assert_eq!(clash.status, StatusCode::BAD_REQUEST);
    assert!(clash.message().contains("room 101"));
    Ok(())
}

#[tokio::test]
async fn back_to_back_and_disjoint_slots_are_fine() -> Result<()> {
    let app = TestApp::spawn().await?;
    let t = monday_nine();

    assert_eq!(schedule(&app, app.ids.teacher, "101", t, 1).await?.status, StatusCode::CREATED);
    assert_eq!(
        schedule(&app, app.ids.teacher, "101", t + Duration::hours(1), 1).await?.status,
        StatusCode::CREATED
    );
    assert_eq!(schedule(&app, app.ids.other_teacher, "202", t, 1).await?.status, StatusCode::CREATED);

    let own = app.get("/api/schedules", &app.other_teacher()).await?;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["pagination"]["total"], 1);

    let all = app.get("/api/schedules", &app.principal()).await?;
    assert_eq!(all.body["pagination"]["total"], 3);

    let parent = app.get("/api/schedules", &app.parent()).await?;
    assert_eq!(parent.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn schedule_requires_a_teacher_and_ordered_times() -> Result<()> {
    let app = TestApp::spawn().await?;
    let t = monday_nine();

    let not_teacher = schedule(&app, app.ids.parent, "101", t, 1).await?;
    assert_eq!(not_teacher.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_teacher.body["details"][0]["field"], "teacherId");

    let reversed = schedule(&app, app.ids.teacher, "101", t, -1).await?;
    assert_eq!(reversed.status, StatusCode::BAD_REQUEST);
    assert_eq!(reversed.body["details"][0]["field"], "endTime");
    Ok(())
}

#[tokio::test]
async fn payments_require_positive_amounts() -> Result<()> {
    let app = TestApp::spawn().await?;
    let today = Utc::now().date_naive().to_string();

    for amount in [json!(0), json!(-50), json!("0.001"), json!(0.004)] {
        let res = app
            .post(
                "/api/finance/payments",
                &app.principal(),
                json!({ "studentId": app.ids.student, "amount": amount, "paymentMethod": "现金", "paymentDate": today }),
            )
            .await?;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["details"][0]["field"], "amount");
    }

    let bad_method = app
        .post(
            "/api/finance/payments",
            &app.principal(),
            json!({ "studentId": app.ids.student, "amount": 100, "paymentMethod": "比特币", "paymentDate": today }),
        )
        .await?;
    assert_eq!(bad_method.status, StatusCode::BAD_REQUEST);

    let listed = app.get("/api/finance/payments", &app.principal()).await?;
    assert_eq!(listed.body["pagination"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn payment_amounts_are_kept_to_the_cent() -> Result<()> {
    let app = TestApp::spawn().await?;
    let today = Utc::now().date_naive().to_string();

    let res = app
        .post(
            "/api/finance/payments",
            &app.principal(),
            json!({ "studentId": app.ids.student, "amount": "0.014", "paymentMethod": "微信", "paymentDate": today }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(money(&res.data()["amount"]), Decimal::new(1, 2));
    Ok(())
}

#[tokio::test]
async fn parents_see_only_their_childrens_payments() -> Result<()> {
    let app = TestApp::spawn().await?;
    let today = Utc::now().date_naive().to_string();

    for (student, amount) in [(app.ids.student, 1500), (app.ids.student, 300), (app.ids.other_student, 1500)] {
        let res = app
            .post(
                "/api/finance/payments",
                &app.principal(),
                json!({ "studentId": student, "amount": amount, "paymentMethod": "支付宝", "paymentDate": today }),
            )
            .await?;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        assert_eq!(res.message(), "Payment recorded");
    }

    let mine = app.get("/api/finance/payments", &app.parent()).await?;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.data()["payments"].as_array().map(Vec::len), Some(2));
    assert_eq!(money(&mine.data()["totalAmount"]), Decimal::from(1800));

    let all = app.get("/api/finance/payments", &app.principal()).await?;
    assert_eq!(all.body["pagination"]["total"], 3);

    let denied = app
        .post(
            "/api/finance/payments",
            &app.parent(),
            json!({ "studentId": app.ids.student, "amount": 1, "paymentMethod": "现金", "paymentDate": today }),
        )
        .await?;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    Ok(())
}
