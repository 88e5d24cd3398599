use std::{path::Path, sync::Arc};

use chrono::{Duration, Local};
use poem::{
    http::StatusCode,
    test::{TestClient, TestForm, TestFormField},
};
use sqlx::PgPool;

use crate::{
    core::test_utils::{generate_test_user, test_app_state},
    factory::employee::EmployeeFactory,
    init_openapi_route,
    model::{employee::Employee, role::Role},
    repository::employee::get_employee_by_id,
    AppState,
};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn employee_form(code: &str, email: &str) -> TestForm {
    let hire_date = (Local::now() - Duration::days(30)).date_naive();
    TestForm::new()
        .text("employee_code", code)
        .text("full_name", "Jane Doe")
        .text("email", email)
        .text("position", "Engineer")
        .text("department", "IT")
        .text("salary", "8500.50")
        .text("hire_date", hire_date.format("%Y-%m-%d").to_string())
        .text("birth_date", "1990-04-12")
        .text("gender", "Female")
}

fn photo_field(file_name: &str) -> TestFormField {
    TestFormField::bytes(PNG_BYTES.to_vec())
        .name("photo")
        .filename(file_name)
        .content_type("image/png")
}

fn stored_files(dir: &str) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[sqlx::test]
async fn test_get_paginate_employee_api(pool: PgPool) -> anyhow::Result<()> {
    // Given
    let (app_state, config) = test_app_state(pool)?;
    let mut redis_conn = app_state.redis_conn.get()?;
    let user = generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "test_user",
        "Password123",
        Role::User,
    )
    .await?;
    let mut factory = EmployeeFactory::new();
    factory.modified_many(|data, idx, _| Employee {
        status: if idx < 20 { "Active" } else { "Resigned" }.to_string(),
        ..data.clone()
    });
    factory.generate_many(&app_state.db, 25, ()).await?;
    let cli = TestClient::new(init_openapi_route(app_state.clone(), &config));

    // When
    let resp = cli
        .get("/api/employees")
        .query("page", &2)
        .query("limit", &10)
        .header("authorization", format!("Bearer {}", user.token))
        .send()
        .await;

    // Expect
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let object = json.value().object();
    object.get("data").array().assert_len(10);
    let pagination = object.get("pagination").object();
    pagination.get("page").assert_i64(2);
    pagination.get("total").assert_i64(25);
    pagination.get("total_pages").assert_i64(3);

    // When the page is far past the end
    let resp = cli
        .get("/api/employees")
        .query("page", &50_000_000)
        .query("limit", &100)
        .header("authorization", format!("Bearer {}", user.token))
        .send()
        .await;

    // Expect an empty page
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let object = json.value().object();
    object.get("data").array().assert_len(0);
    let pagination = object.get("pagination").object();
    pagination.get("page").assert_i64(50_000_000);
    pagination.get("total").assert_i64(25);
    pagination.get("total_pages").assert_i64(1);

    // When filtered by status
    let resp = cli
        .get("/api/employees")
        .query("status", &"Resigned")
        .query("sort_by", &"salary")
        .query("sort_order", &"asc")
        .header("authorization", format!("Bearer {}", user.token))
        .send()
        .await;

    // Expect
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let data = json.value().object().get("data").array();
    data.assert_len(5);
    let salaries: Vec<f64> = data
        .iter()
        .map(|item| item.object().get("salary").deserialize())
        .collect();
    assert!(salaries.windows(2).all(|pair| pair[0] <= pair[1]));

    // When status filter is not a status
    let resp = cli
        .get("/api/employees")
        .query("status", &"Retired")
        .header("authorization", format!("Bearer {}", user.token))
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[sqlx::test]
async fn test_get_detail_employee_api(pool: PgPool) -> anyhow::Result<()> {
    // Given
    let (app_state, config) = test_app_state(pool)?;
    let mut redis_conn = app_state.redis_conn.get()?;
    let user = generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "test_user",
        "Password123",
        Role::User,
    )
    .await?;
    let mut factory = EmployeeFactory::new();
    let employee = factory.generate_one(&app_state.db, ()).await?;
    let cli = TestClient::new(init_openapi_route(app_state.clone(), &config));

    // When
    let resp = cli
        .get(format!("/api/employees/{}", employee.id))
        .header("authorization", format!("Bearer {}", user.token))
        .send()
        .await;

    // Expect
    resp.assert_status_is_ok();
    let json = resp.json().await;
    json.value()
        .object()
        .get("data")
        .object()
        .get("employee_code")
        .assert_string(&employee.employee_code);

    // When unknown id
    let resp = cli
        .get(format!("/api/employees/{}", uuid::Uuid::now_v7()))
        .header("authorization", format!("Bearer {}", user.token))
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::NOT_FOUND);

    // When malformed id
    let resp = cli
        .get("/api/employees/42")
        .header("authorization", format!("Bearer {}", user.token))
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[sqlx::test]
async fn test_employee_photo_lifecycle(pool: PgPool) -> anyhow::Result<()> {
    // Given
    let (app_state, config) = test_app_state(pool)?;
    let mut redis_conn = app_state.redis_conn.get()?;
    let admin = generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "admin_user",
        "Password123",
        Role::Admin,
    )
    .await?;
    let cli = TestClient::new(init_openapi_route(app_state.clone(), &config));

    // When create with photo
    let resp = cli
        .post("/api/employees")
        .header("authorization", format!("Bearer {}", admin.token))
        .multipart(employee_form("EMP-001", "jane@company.test").field(photo_field("jane.png")))
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::CREATED);
    let json = resp.json().await;
    let data = json.value().object().get("data").object();
    data.get("status").assert_string("Active");
    let id: String = data.get("id").deserialize();
    let first_photo: String = data.get("photo").deserialize();
    assert!(first_photo.ends_with(".png"));
    assert!(app_state.photos.path(&first_photo).exists());
    let employee = get_employee_by_id(&app_state.db, &id.parse()?).await?.unwrap();
    assert_eq!(employee.created_by, Some(admin.user.id));
    assert_eq!(employee.salary, Some(8500.50));

    // When update with a replacement photo
    let resp = cli
        .post(format!("/api/employees/{}", id))
        .header("authorization", format!("Bearer {}", admin.token))
        .multipart(
            TestForm::new()
                .text("position", "Lead Engineer")
                .text("address", "")
                .field(photo_field("jane-2.png")),
        )
        .send()
        .await;

    // Expect
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let data = json.value().object().get("data").object();
    data.get("position").assert_string("Lead Engineer");
    data.get("full_name").assert_string("Jane Doe");
    let second_photo: String = data.get("photo").deserialize();
    assert_ne!(first_photo, second_photo);
    assert!(!app_state.photos.path(&first_photo).exists());
    assert!(app_state.photos.path(&second_photo).exists());

    // When delete
    let resp = cli
        .delete(format!("/api/employees/{}", id))
        .header("authorization", format!("Bearer {}", admin.token))
        .send()
        .await;

    // Expect
    resp.assert_status_is_ok();
    assert!(!app_state.photos.path(&second_photo).exists());
    assert_eq!(stored_files(&config.upload_dir), 0);
    Ok(())
}

#[sqlx::test]
async fn test_create_employee_rejected(pool: PgPool) -> anyhow::Result<()> {
    // Given
    let (app_state, config) = test_app_state(pool)?;
    let mut redis_conn = app_state.redis_conn.get()?;
    let admin = generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "admin_user",
        "Password123",
        Role::Admin,
    )
    .await?;
    let user = generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "test_user",
        "Password123",
        Role::User,
    )
    .await?;
    let mut factory = EmployeeFactory::new();
    factory.modified_one(|data, _| Employee {
        employee_code: "EMP-001".to_string(),
        ..data.clone()
    });
    factory.generate_one(&app_state.db, ()).await?;
    let cli = TestClient::new(init_openapi_route(app_state.clone(), &config));

    // When without employees.create
    let resp = cli
        .post("/api/employees")
        .header("authorization", format!("Bearer {}", user.token))
        .multipart(employee_form("EMP-002", "someone@company.test"))
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::FORBIDDEN);

    // When required fields are missing
    let resp = cli
        .post("/api/employees")
        .header("authorization", format!("Bearer {}", admin.token))
        .multipart(
            TestForm::new()
                .text("full_name", "No Code")
                .field(photo_field("nocode.png")),
        )
        .send()
        .await;

    // Expect nothing stored
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(stored_files(&config.upload_dir), 0);

    // When the code is taken
    let resp = cli
        .post("/api/employees")
        .header("authorization", format!("Bearer {}", admin.token))
        .multipart(employee_form("EMP-001", "fresh@company.test").field(photo_field("dup.png")))
        .send()
        .await;

    // Expect the uploaded photo is cleaned up
    resp.assert_status(StatusCode::CONFLICT);
    assert_eq!(stored_files(&config.upload_dir), 0);

    // When the photo is not an image
    let resp = cli
        .post("/api/employees")
        .header("authorization", format!("Bearer {}", admin.token))
        .multipart(
            employee_form("EMP-003", "other@company.test").field(
                TestFormField::bytes(b"%PDF-1.4".to_vec())
                    .name("photo")
                    .filename("cv.pdf")
                    .content_type("application/pdf"),
            ),
        )
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert!(!Path::new(&config.upload_dir).join("cv.pdf").exists());
    Ok(())
}

#[sqlx::test]
async fn test_create_employee_oversized_photo(pool: PgPool) -> anyhow::Result<()> {
    // Given a 1 KiB upload limit
    let (base, mut config) = test_app_state(pool)?;
    config.max_upload_size = 1024;
    let app_state = Arc::new(AppState::new(
        base.db.clone(),
        base.redis_conn.clone(),
        config.clone(),
    ));
    let mut redis_conn = app_state.redis_conn.get()?;
    let admin = generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "admin_user",
        "Password123",
        Role::Admin,
    )
    .await?;
    let cli = TestClient::new(init_openapi_route(app_state.clone(), &config));
    let big_photo = |size: usize| {
        TestFormField::bytes(vec![0u8; size])
            .name("photo")
            .filename("big.png")
            .content_type("image/png")
    };

    // When the photo is over the limit
    let resp = cli
        .post("/api/employees")
        .header("authorization", format!("Bearer {}", admin.token))
        .multipart(employee_form("EMP-001", "jane@company.test").field(big_photo(2048)))
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(stored_files(&config.upload_dir), 0);

    // When the declared body is over the limit
    let resp = cli
        .post("/api/employees")
        .header("authorization", format!("Bearer {}", admin.token))
        .header("content-length", 10 * 1024 * 1024)
        .multipart(employee_form("EMP-002", "john@company.test").field(big_photo(16)))
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    // When an undeclared body runs past the limit
    let resp = cli
        .post("/api/employees")
        .header("authorization", format!("Bearer {}", admin.token))
        .multipart(employee_form("EMP-003", "joan@company.test").field(big_photo(256 * 1024)))
        .send()
        .await;

    // Expect
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(stored_files(&config.upload_dir), 0);
    assert!(get_all_codes(&app_state.db).await?.is_empty());
    Ok(())
}

async fn get_all_codes(db: &PgPool) -> anyhow::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT employee_code FROM public.employees")
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.0).collect())
}

#[sqlx::test]
async fn test_get_employee_stats_api(pool: PgPool) -> anyhow::Result<()> {
    // Given
    let (app_state, config) = test_app_state(pool)?;
    let mut redis_conn = app_state.redis_conn.get()?;
    let user = generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "test_user",
        "Password123",
        Role::User,
    )
    .await?;
    let mut factory = EmployeeFactory::new();
    factory.modified_many(|data, idx, _| Employee {
        department: if idx < 4 { "IT" } else { "HR" }.to_string(),
        ..data.clone()
    });
    factory.generate_many(&app_state.db, 7, ()).await?;
    let cli = TestClient::new(init_openapi_route(app_state.clone(), &config));

    // When
    let resp = cli
        .get("/api/employees/stats")
        .header("authorization", format!("Bearer {}", user.token))
        .send()
        .await;

    // Expect
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let data = json.value().object().get("data").object();
    data.get("total").assert_i64(7);
    let by_department = data.get("by_department").array();
    by_department.assert_len(2);
    by_department.get(0).object().get("label").assert_string("IT");
    by_department.get(0).object().get("count").assert_i64(4);
    data.get("recent").array().assert_len(5);

    // When anonymous
    let resp = cli.get("/api/employees/stats").send().await;

    // Expect
    resp.assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}
