/// Integration tests for the Taskdesk API
///
/// These tests run against a live Postgres and Redis, so every test is
/// marked `#[ignore]`; run them with:
///
/// ```bash
/// DATABASE_URL=... REDIS_URL=... cargo test -p taskdesk-api -- --ignored
/// ```
///
/// Coverage:
/// - Registration and login flow
/// - Authentication requirement
/// - Task lifecycle (create, read, update, complete, delete)
/// - Authorization on cached and uncached reads
/// - Detail freshness after edits, including a stale cached snapshot
/// - Task activity log
/// - List cache invalidation after writes
/// - Notification fan-out and acknowledgement
/// - Deadline reminder job end to end

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestContext;
use serde_json::json;
use taskdesk_shared::models::task::Task;
use taskdesk_shared::models::user::Role;
use taskdesk_worker::jobs;
use taskdesk_worker::mailer::MockMailer;

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_register_then_login() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("register-{}@example.com", uuid::Uuid::new_v4());

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": common::TEST_PASSWORD,
                "name": "New User"
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({
                "email": email,
                "password": common::TEST_PASSWORD
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert!(body["access_token"].is_string());

    // Wrong password gets the same generic message as an unknown email
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({
                "email": email,
                "password": "WrongPassw0rd!"
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(&email)
        .execute(&ctx.db)
        .await
        .unwrap();
    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.request("GET", "/v1/tasks", None, None).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_task_lifecycle() {
    let ctx = TestContext::new().await.unwrap();
    let token = ctx.jwt_token.clone();

    // Create
    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({
                "title": "Lifecycle task",
                "description": "end to end",
                "priority": "high"
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "create failed: {task}");
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["status"], "todo");
    assert!(task["completed_at"].is_null());

    // Read
    let (status, got) = ctx
        .request("GET", &format!("/v1/tasks/{task_id}"), Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["title"], "Lifecycle task");

    // Complete requires an assignee
    let (status, body) = ctx
        .request(
            "POST",
            &format!("/v1/tasks/{task_id}/complete"),
            Some(&token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "unexpected: {body}");

    // Assign to self, then complete
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{task_id}"),
            Some(&token),
            Some(json!({
                "title": "Lifecycle task",
                "description": "end to end",
                "status": "in_progress",
                "priority": "high",
                "assigned_to": ctx.user.id
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, completed) = ctx
        .request(
            "POST",
            &format!("/v1/tasks/{task_id}/complete"),
            Some(&token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");
    assert!(!completed["completed_at"].is_null());

    // Completing again is a no-op
    let (status, again) = ctx
        .request(
            "POST",
            &format!("/v1/tasks/{task_id}/complete"),
            Some(&token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["completed_at"], completed["completed_at"]);

    // Delete
    let (status, _) = ctx
        .request("DELETE", &format!("/v1/tasks/{task_id}"), Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .request("GET", &format!("/v1/tasks/{task_id}"), Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_authorization_holds_on_cached_reads() {
    let mut ctx = TestContext::new().await.unwrap();
    let creator_token = ctx.jwt_token.clone();

    let stranger = ctx.create_user(Role::User).await.unwrap();
    let stranger_token = ctx.token_for(&stranger).unwrap();

    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&creator_token),
            Some(json!({ "title": "Private task" })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let task_id = task["id"].as_str().unwrap().to_string();

    // Warm the detail cache as the creator
    let (status, _) = ctx
        .request("GET", &format!("/v1/tasks/{task_id}"), Some(&creator_token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // The cached entry must not leak to a non-participant
    let (status, _) = ctx
        .request("GET", &format!("/v1/tasks/{task_id}"), Some(&stranger_token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_assignee_can_edit_but_not_delete() {
    let mut ctx = TestContext::new().await.unwrap();
    let creator_token = ctx.jwt_token.clone();

    let assignee = ctx.create_user(Role::User).await.unwrap();
    let assignee_token = ctx.token_for(&assignee).unwrap();

    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&creator_token),
            Some(json!({
                "title": "Assigned task",
                "assigned_to": assignee.id
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let task_id = task["id"].as_str().unwrap().to_string();

    // Assignees may edit
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{task_id}"),
            Some(&assignee_token),
            Some(json!({
                "title": "Assigned task",
                "description": "picked up",
                "status": "in_progress",
                "priority": "medium",
                "assigned_to": assignee.id
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // But not delete
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/tasks/{task_id}"),
            Some(&assignee_token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_list_reflects_writes_through_cache() {
    let ctx = TestContext::new().await.unwrap();
    let token = ctx.jwt_token.clone();

    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({ "title": "Cache sentinel" })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let task_id = task["id"].as_str().unwrap().to_string();

    // Warm the list cache
    let (status, first) = ctx
        .request("GET", "/v1/tasks?q=Cache+sentinel", Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(first["total"].as_i64().unwrap() >= 1);

    // A write invalidates the cached list
    let (status, _) = ctx
        .request("DELETE", &format!("/v1/tasks/{task_id}"), Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, second) = ctx
        .request("GET", "/v1/tasks?q=Cache+sentinel", Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        second["total"].as_i64().unwrap(),
        first["total"].as_i64().unwrap() - 1
    );

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_detail_fresh_after_edit_and_stale_until_invalidated() {
    let ctx = TestContext::new().await.unwrap();
    let token = ctx.jwt_token.clone();

    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({ "title": "First title" })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let task_id = task["id"].as_str().unwrap().to_string();
    let task_uuid = uuid::Uuid::parse_str(&task_id).unwrap();

    // Warm the detail cache
    let (status, got) = ctx
        .request("GET", &format!("/v1/tasks/{task_id}"), Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["title"], "First title");

    // Editing invalidates the cached snapshot; the next read is fresh
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{task_id}"),
            Some(&token),
            Some(json!({
                "title": "Second title",
                "status": "todo",
                "priority": "medium"
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, got) = ctx
        .request("GET", &format!("/v1/tasks/{task_id}"), Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["title"], "Second title");

    // A snapshot left behind by an earlier read is served as-is until a
    // write invalidates it
    let mut stale = Task::find_by_id(&ctx.db, task_uuid).await.unwrap().unwrap();
    stale.title = "First title".to_string();
    ctx.cache.put_detail(&stale).await;

    let (status, got) = ctx
        .request("GET", &format!("/v1/tasks/{task_id}"), Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["title"], "First title");

    ctx.cache.invalidate_task(task_uuid, &stale.affected_users()).await;

    let (status, got) = ctx
        .request("GET", &format!("/v1/tasks/{task_id}"), Some(&token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["title"], "Second title");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_task_activity_records_mutations() {
    let mut ctx = TestContext::new().await.unwrap();
    let token = ctx.jwt_token.clone();

    let stranger = ctx.create_user(Role::User).await.unwrap();
    let stranger_token = ctx.token_for(&stranger).unwrap();

    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({ "title": "Audited task" })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{task_id}"),
            Some(&token),
            Some(json!({
                "title": "Audited task",
                "status": "in_progress",
                "priority": "medium",
                "assigned_to": ctx.user.id
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // Newest first: the update precedes the creation
    let (status, log) = ctx
        .request(
            "GET",
            &format!("/v1/tasks/{task_id}/activity"),
            Some(&token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "activity failed: {log}");
    let log = log.as_array().unwrap();
    assert!(log.len() >= 2);
    assert_eq!(log.last().unwrap()["action"], "created");

    // Activity follows task visibility
    let (status, _) = ctx
        .request(
            "GET",
            &format!("/v1/tasks/{task_id}/activity"),
            Some(&stranger_token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_notification_fan_out_and_acknowledge() {
    let mut ctx = TestContext::new().await.unwrap();
    let creator_token = ctx.jwt_token.clone();

    let assignee = ctx.create_user(Role::User).await.unwrap();
    let assignee_token = ctx.token_for(&assignee).unwrap();

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&creator_token),
            Some(json!({
                "title": "Notify me",
                "assigned_to": assignee.id
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // The assignee was notified; the acting creator was not
    let (status, unread) = ctx
        .request("GET", "/v1/notifications", Some(&assignee_token), None)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let unread = unread.as_array().unwrap();
    assert!(unread.iter().any(|n| n["message"]
        .as_str()
        .unwrap()
        .contains("Notify me")));
    let notification_id = unread[0]["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(
            "POST",
            &format!("/v1/notifications/{notification_id}/read"),
            Some(&assignee_token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // Acknowledging someone else's notification is a 404, not a leak
    let (status, _) = ctx
        .request(
            "POST",
            &format!("/v1/notifications/{notification_id}/read"),
            Some(&creator_token),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // requires live Postgres and Redis
async fn test_deadline_reminder_end_to_end() {
    let ctx = TestContext::new().await.unwrap();
    let token = ctx.jwt_token.clone();

    let due = (Utc::now() + Duration::days(1)).date_naive();
    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({
                "title": "Due tomorrow",
                "assigned_to": ctx.user.id,
                "due_date": due.to_string()
            })),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "create failed: {task}");

    let mailer = MockMailer::new();
    let sent = jobs::deadline::run(&ctx.db, &mailer).await.unwrap();
    assert!(sent >= 1);

    let emails = mailer.sent();
    assert!(emails.iter().any(|e| {
        e.to == ctx.user.email && e.subject.contains("Due tomorrow")
    }));

    // The reminder is claimed; a second pass sends nothing for this task
    let second = MockMailer::new();
    jobs::deadline::run(&ctx.db, &second).await.unwrap();
    assert!(!second.sent().iter().any(|e| e.subject.contains("Due tomorrow")));

    ctx.cleanup().await.unwrap();
}
