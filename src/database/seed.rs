use chrono::{Datelike, Duration, Months, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tracing::info;

use crate::auth::{hash_password, PasswordError, Role};
use crate::database::models::*;
use crate::database::{Database, DatabaseError};
use crate::types::Id;

/// Password shared by every demo account
pub const DEMO_PASSWORD: &str = "kinder123";

// One argon2 hash shared by every demo account
static DEMO_PASSWORD_HASH: Lazy<Result<String, PasswordError>> = Lazy::new(|| hash_password(DEMO_PASSWORD));

/// Ids of the rows created by [`seed_demo`]
#[derive(Debug, Clone, Copy)]
pub struct DemoIds {
    pub admin: Id,
    pub principal: Id,
    pub teacher: Id,
    pub other_teacher: Id,
    pub parent: Id,
    pub other_parent: Id,
    pub class: Id,
    pub other_class: Id,
    pub student: Id,
    pub other_student: Id,
    pub activity: Id,
    pub plan: Id,
}

/// Populate an open database with a small kindergarten
pub async fn seed_demo(db: &Database) -> Result<DemoIds, DatabaseError> {
    let now = Utc::now();
    let today = now.date_naive();
    let password_hash = DEMO_PASSWORD_HASH
        .clone()
        .map_err(|e| DatabaseError::Aborted(e.to_string()))?;

    let user = |username: &str, name: &str, role: Role, salary: Option<i64>| User {
        id: 0,
        version: 0,
        username: username.to_string(),
        name: name.to_string(),
        email: format!("{}@kinder.example", username),
        phone: None,
        role,
        password_hash: password_hash.clone(),
        salary: salary.map(Decimal::from),
        created_at: now,
        updated_at: now,
    };

    let admin = db.users.insert(user("admin", "系统管理员", Role::Admin, None)).await?;
    let principal = db.users.insert(user("principal", "刘园长", Role::Principal, None)).await?;
    let teacher = db.users.insert(user("teacher_wang", "王老师", Role::Teacher, Some(6000))).await?;
    let other_teacher = db.users.insert(user("teacher_chen", "陈老师", Role::Teacher, Some(5800))).await?;
    let parent = db.users.insert(user("parent_li", "李女士", Role::Parent, None)).await?;
    let other_parent = db.users.insert(user("parent_zhang", "张先生", Role::Parent, None)).await?;

    let class = |name: &str, grade: Grade, teacher_id: Id, capacity: u32| ClassRoom {
        id: 0,
        version: 0,
        name: name.to_string(),
        grade,
        teacher_id,
        capacity,
        created_at: now,
        updated_at: now,
    };

    let sunflower = db.classes.insert(class("向日葵班", Grade::Middle, teacher.id, 25)).await?;
    let little_star = db.classes.insert(class("小星星班", Grade::Junior, other_teacher.id, 20)).await?;

    let born_years_ago = |years: u32| -> NaiveDate {
        today.checked_sub_months(Months::new(years * 12)).unwrap_or(today)
    };

    let student = |name: &str, gender: Gender, birth_date: NaiveDate, parent_id: Id, class_id: Id| Student {
        id: 0,
        version: 0,
        name: name.to_string(),
        gender,
        birth_date,
        parent_id,
        class_id: Some(class_id),
        status: StudentStatus::Enrolled,
        created_at: now,
        updated_at: now,
    };

    let xiaoming = db
        .students
        .insert(student("李小明", Gender::Male, born_years_ago(4), parent.id, sunflower.id))
        .await?;
    let xiaohong = db
        .students
        .insert(student("张小红", Gender::Female, born_years_ago(5), other_parent.id, sunflower.id))
        .await?;

    let sports_day = db
        .activities
        .insert(Activity {
            id: 0,
            version: 0,
            title: "春季亲子运动会".to_string(),
            kind: "体育".to_string(),
            description: Some("亲子接力与趣味游戏".to_string()),
            location: Some("操场".to_string()),
            start_time: now + Duration::days(10),
            end_time: now + Duration::days(10) + Duration::hours(3),
            capacity: 30,
            fee: Decimal::from(50),
            status: ActivityStatus::Open,
            registration_deadline: Some(now + Duration::days(8)),
            min_age: Some(3),
            max_age: Some(6),
            created_by: principal.id,
            created_at: now,
        })
        .await?;

    let plan = db
        .plans
        .insert(EnrollmentPlan {
            id: 0,
            version: 0,
            title: "秋季招生计划".to_string(),
            year: today.year() + 1,
            capacity: 60,
            min_age: 3,
            max_age: 6,
            deadline: now + Duration::days(60),
            created_at: now,
        })
        .await?;

    db.settings
        .insert(SystemSettings {
            id: 0,
            version: 0,
            kindergarten_name: "阳光幼儿园".to_string(),
            ai_model: "default".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            updated_at: now,
        })
        .await?;

    info!("Seeded demo kindergarten");

    Ok(DemoIds {
        admin: admin.id,
        principal: principal.id,
        teacher: teacher.id,
        other_teacher: other_teacher.id,
        parent: parent.id,
        other_parent: other_parent.id,
        class: sunflower.id,
        other_class: little_star.id,
        student: xiaoming.id,
        other_student: xiaohong.id,
        activity: sports_day.id,
        plan: plan.id,
    })
}
