mod common;

use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use futures::future::join_all;
use serde_json::json;

use common::{money, TestApp};
use kinder_api::database::models::Registration;
use kinder_api::database::Repository;

async fn create_students(app: &TestApp, count: usize) -> Result<Vec<i64>> {
    let birth = (Utc::now().date_naive() - Duration::days(365 * 4 + 40)).to_string();
    let mut ids = Vec::with_capacity(count);
    for n in 0..count {
        let res = app
            .post(
                "/api/students",
                &app.principal(),
                json!({ "name": format!("学生{}", n), "gender": "女", "birthDate": birth, "parentId": app.ids.parent }),
            )
            .await?;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        ids.push(res.data()["id"].as_i64().unwrap_or_default());
    }
    Ok(ids)
}

#[tokio::test]
async fn concurrent_registrations_never_exceed_capacity() -> Result<()> {
    let app = TestApp::spawn().await?;
    let start = Utc::now() + Duration::days(4);
    let activity = app
        .post(
            "/api/activities",
            &app.principal(),
            json!({
                "title": "小小科学家",
                "type": "科学",
                "startTime": start.to_rfc3339(),
                "endTime": (start + Duration::hours(1)).to_rfc3339(),
                "capacity": 5
            }),
        )
        .await?;
    let activity_id = activity.data()["id"].as_i64().unwrap_or_default();
    let students = create_students(&app, 12).await?;

    let token = app.parent();
    let uri = format!("/api/activities/{}/register", activity_id);
    let replies = join_all(
        students
            .iter()
            .map(|id| app.post(&uri, &token, json!({ "studentId": id }))),
    )
    .await;

    let mut created = 0;
    let mut full = 0;
    for reply in replies {
        let reply = reply?;
        match reply.status {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => {
                assert_eq!(reply.message(), "Activity is at full capacity");
                full += 1;
            }
            other => panic!("unexpected status {}: {}", other, reply.body),
        }
    }
    assert_eq!(created, 5);
    assert_eq!(full, 7);

    let activity = app.get(&format!("/api/activities/{}", activity_id), &token).await?;
    assert_eq!(activity.data()["registeredCount"], 5);
    Ok(())
}

#[tokio::test]
async fn concurrent_class_enrollment_respects_capacity() -> Result<()> {
    let app = TestApp::spawn().await?;
    let class = app
        .post(
            "/api/classes",
            &app.principal(),
            json!({ "name": "彩虹班", "grade": "大班", "teacherId": app.ids.other_teacher, "capacity": 3 }),
        )
        .await?;
    let class_id = class.data()["id"].as_i64().unwrap_or_default();
    let birth = (Utc::now().date_naive() - Duration::days(365 * 5 + 40)).to_string();

    let token = app.principal();
    let replies = join_all((0..8).map(|n| {
        app.post(
            "/api/students",
            &token,
            json!({ "name": format!("彩虹{}", n), "gender": "男", "birthDate": birth, "parentId": app.ids.other_parent, "classId": class_id }),
        )
    }))
    .await;

    let created = replies
        .into_iter()
        .filter_map(Result::ok)
        .filter(|r| r.status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 3);

    let view = app.get(&format!("/api/classes/{}", class_id), &token).await?;
    assert_eq!(view.data()["currentCount"], 3);
    Ok(())
}

#[tokio::test]
async fn versioned_concurrent_updates_admit_exactly_one_writer() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.principal();
    let uri = format!("/api/classes/{}", app.ids.other_class);

    let replies = join_all((0..10).map(|n| {
        app.put(&uri, &token, json!({ "name": format!("小星星{}班", n), "version": 1 }))
    }))
    .await;

    let mut ok = 0;
    let mut conflicts = 0;
    for reply in replies {
        let reply = reply?;
        match reply.status {
            StatusCode::OK => ok += 1,
            StatusCode::CONFLICT => {
                assert_eq!(reply.error_code(), "CONCURRENT_MODIFICATION");
                conflicts += 1;
            }
            other => panic!("unexpected status {}: {}", other, reply.body),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 9);

    let class = app.get(&uri, &token).await?;
    assert_eq!(class.data()["version"], 2);
    Ok(())
}

#[tokio::test]
async fn unversioned_concurrent_updates_are_last_write_wins() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.principal();
    let uri = format!("/api/classes/{}", app.ids.other_class);

    let replies = join_all((0..5).map(|n| app.put(&uri, &token, json!({ "capacity": 20 + n })))).await;
    for reply in replies {
        assert_eq!(reply?.status, StatusCode::OK);
    }

    let class = app.get(&uri, &token).await?;
    assert_eq!(class.data()["version"], 6);
    Ok(())
}

#[tokio::test]
async fn bulk_concurrent_reads_all_succeed_quickly() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin();

    let started = Instant::now();
    let replies = join_all((0..100).map(|_| app.get("/api/students?limit=50", &token))).await;
    let elapsed = started.elapsed();

    for reply in replies {
        assert_eq!(reply?.status, StatusCode::OK);
    }
    assert!(elapsed < StdDuration::from_secs(5), "took {:?}", elapsed);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelling_during_registration_leaves_no_seat_unrefunded() -> Result<()> {
    let app = Arc::new(TestApp::spawn().await?);
    let students = create_students(&app, 10).await?;
    let activity_id = app.ids.activity;

    let mut tasks = Vec::new();
    for (n, student) in students.into_iter().enumerate() {
        let task_app = app.clone();
        tasks.push(tokio::spawn(async move {
            let uri = format!("/api/activities/{}/register", activity_id);
            task_app.post(&uri, &task_app.parent(), json!({ "studentId": student })).await
        }));
        if n == 4 {
            let app = app.clone();
            tasks.push(tokio::spawn(async move {
                app.delete(&format!("/api/activities/{}", activity_id), &app.principal()).await
            }));
        }
    }
    for task in tasks {
        let reply = task.await??;
        assert!(reply.status.is_success() || reply.status == StatusCode::BAD_REQUEST, "{}", reply.body);
    }

    let activity = app.get(&format!("/api/activities/{}", activity_id), &app.principal()).await?;
    assert_eq!(activity.data()["status"], "已取消");
    assert_eq!(activity.data()["registeredCount"], 0);

    let rows = app
        .state
        .db
        .registrations
        .find(&|r: &Registration| r.activity_id == activity_id)
        .await?;
    for row in rows {
        assert!(!row.is_active(), "registration {} still active", row.id);
        let refund = serde_json::to_value(row.refund)?;
        assert_eq!(money(&refund), row.fee);
    }
    Ok(())
}
