/// Integration tests for tasks, subtasks, and attachments
///
/// Covers:
/// - Multipart task creation with seed subtasks and file uploads
/// - The derived task status across subtask create, flip, and delete
/// - Subtask completion permissions (assignee vs admin tier)
/// - Attachment removal ordering and orphaned-file reporting

mod common;

use axum::http::{Method, StatusCode};
use common::TestContext;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_subtasks_drive_task_status() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let project_id = ctx.create_project(&admin.token, "Release").await;

    let task = ctx
        .create_task(
            &admin.token,
            project_id,
            json!({
                "title": "Ship it",
                "assigned_to": admin.user.id,
                "subtasks": ["write changelog", "tag release"],
            }),
        )
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["status"], "todo");

    let (status, body) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}/tasks/{task_id}/subtasks"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let subtasks = body.as_array().unwrap().clone();
    assert_eq!(subtasks.len(), 2);

    let first = subtasks[0]["id"].as_str().unwrap().to_string();
    let second = subtasks[1]["id"].as_str().unwrap().to_string();

    let flip = |subtask_id: String, done: bool| {
        let uri = format!(
            "/v1/projects/{project_id}/tasks/{task_id}/subtasks/{subtask_id}/status"
        );
        let token = admin.token.clone();
        let ctx = &ctx;
        async move {
            let (status, body) = ctx
                .request(
                    Method::PATCH,
                    &uri,
                    Some(&token),
                    Some(json!({ "is_completed": done })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "status flip failed: {body}");
            body["task_status"].as_str().unwrap().to_string()
        }
    };

    // 1 of 2 done
    assert_eq!(flip(first.clone(), true).await, "in_progress");
    // 2 of 2 done
    assert_eq!(flip(second.clone(), true).await, "done");
    // Back to 1 of 2
    assert_eq!(flip(first.clone(), false).await, "in_progress");

    // Deleting the incomplete one leaves only completed subtasks
    let (status, body) = ctx
        .request(
            Method::DELETE,
            &format!("/v1/projects/{project_id}/tasks/{task_id}/subtasks/{first}"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_status"], "done");

    // A new open subtask drops the task back to in_progress
    let (status, body) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{project_id}/tasks/{task_id}/subtasks"),
            Some(&admin.token),
            Some(json!({ "title": "update docs" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["task_status"], "in_progress");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_direct_status_writes_yield_to_recompute() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let project_id = ctx.create_project(&admin.token, "Manual").await;

    let task = ctx
        .create_task(
            &admin.token,
            project_id,
            json!({ "title": "Odd job", "assigned_to": admin.user.id }),
        )
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    // A direct write sticks...
    let (status, body) = ctx
        .request(
            Method::PUT,
            &format!("/v1/projects/{project_id}/tasks/{task_id}"),
            Some(&admin.token),
            Some(json!({ "status": "done" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "done");

    // ...until the next subtask mutation recomputes it
    let (status, body) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{project_id}/tasks/{task_id}/subtasks"),
            Some(&admin.token),
            Some(json!({ "title": "actually do it" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["task_status"], "todo");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_subtask_completion_permissions() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let assignee = ctx.signup("assignee").await.unwrap();
    let bystander = ctx.signup("bystander").await.unwrap();

    let project_id = ctx.create_project(&admin.token, "Permissions").await;
    ctx.add_member(&admin.token, project_id, &assignee.user.email, "member")
        .await;
    ctx.add_member(&admin.token, project_id, &bystander.user.email, "member")
        .await;

    let task = ctx
        .create_task(
            &admin.token,
            project_id,
            json!({
                "title": "Guarded",
                "assigned_to": assignee.user.id,
                "subtasks": ["step one"],
            }),
        )
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    let (_, body) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}/tasks/{task_id}/subtasks"),
            Some(&admin.token),
            None,
        )
        .await;
    let subtask_id = body[0]["id"].as_str().unwrap().to_string();
    let status_uri = format!(
        "/v1/projects/{project_id}/tasks/{task_id}/subtasks/{subtask_id}/status"
    );

    // A member who isn't the assignee can't flip it
    let (status, _) = ctx
        .request(
            Method::PATCH,
            &status_uri,
            Some(&bystander.token),
            Some(json!({ "is_completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The assignee can
    let (status, _) = ctx
        .request(
            Method::PATCH,
            &status_uri,
            Some(&assignee.token),
            Some(json!({ "is_completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // And so can the admin
    let (status, _) = ctx
        .request(
            Method::PATCH,
            &status_uri,
            Some(&admin.token),
            Some(json!({ "is_completed": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_assignee_must_be_a_member() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let outsider = ctx.signup("outsider").await.unwrap();
    let project_id = ctx.create_project(&admin.token, "Strict").await;

    let (status, _) = ctx
        .multipart_request(
            &format!("/v1/projects/{project_id}/tasks"),
            &admin.token,
            &json!({ "title": "Orphan", "assigned_to": outsider.user.id }),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_attachment_upload_and_removal() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let project_id = ctx.create_project(&admin.token, "Files").await;

    let (status, task) = ctx
        .multipart_request(
            &format!("/v1/projects/{project_id}/tasks"),
            &admin.token,
            &json!({ "title": "With files", "assigned_to": admin.user.id }),
            &[
                ("spec.pdf", "application/pdf", b"pdf bytes".as_slice()),
                ("shot.png", "image/png", b"png bytes".as_slice()),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "upload failed: {task}");

    let task_id = task["id"].as_str().unwrap().to_string();
    let attachments = task["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 2);
    assert_eq!(ctx.storage.file_count(), 2);

    // Only the image gets a thumbnail
    let png = attachments
        .iter()
        .find(|a| a["url"].as_str().unwrap().ends_with("shot.png"))
        .unwrap();
    assert!(png["thumbnail"].is_string());

    let pdf = attachments
        .iter()
        .find(|a| a["url"].as_str().unwrap().ends_with("spec.pdf"))
        .unwrap();
    assert!(pdf["thumbnail"].is_null());

    // Remove the pdf: gone from both the record and the store
    let pdf_id = pdf["file_id"].as_str().unwrap().to_string();
    let (status, body) = ctx
        .request(
            Method::DELETE,
            &format!("/v1/projects/{project_id}/tasks/{task_id}/attachments/{pdf_id}"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attachments"].as_array().unwrap().len(), 1);
    assert!(!ctx.storage.contains(&pdf_id));

    // Unknown attachment IDs are a 404
    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!(
                "/v1/projects/{project_id}/tasks/{task_id}/attachments/{}",
                Uuid::new_v4()
            ),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_attachment_entry_survives_storage_failure() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let project_id = ctx.create_project(&admin.token, "Flaky storage").await;

    let (status, task) = ctx
        .multipart_request(
            &format!("/v1/projects/{project_id}/tasks"),
            &admin.token,
            &json!({ "title": "Fragile", "assigned_to": admin.user.id }),
            &[("data.bin", "application/octet-stream", b"blob".as_slice())],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let task_id = task["id"].as_str().unwrap().to_string();
    let file_id = task["attachments"][0]["file_id"].as_str().unwrap().to_string();

    // While the store is down, the bookkeeping entry must not disappear
    ctx.storage.set_fail_deletes(true);
    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("/v1/projects/{project_id}/tasks/{task_id}/attachments/{file_id}"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, body) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}/tasks/{task_id}"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(body["attachments"].as_array().unwrap().len(), 1);

    // Store recovers, removal goes through
    ctx.storage.set_fail_deletes(false);
    let (status, body) = ctx
        .request(
            Method::DELETE,
            &format!("/v1/projects/{project_id}/tasks/{task_id}/attachments/{file_id}"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["attachments"].as_array().unwrap().is_empty());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_cascading_deletes_sweep_storage() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let project_id = ctx.create_project(&admin.token, "Teardown").await;

    let (_, first) = ctx
        .multipart_request(
            &format!("/v1/projects/{project_id}/tasks"),
            &admin.token,
            &json!({ "title": "First", "assigned_to": admin.user.id }),
            &[("a.txt", "text/plain", b"a".as_slice())],
        )
        .await;
    let (_, second) = ctx
        .multipart_request(
            &format!("/v1/projects/{project_id}/tasks"),
            &admin.token,
            &json!({ "title": "Second", "assigned_to": admin.user.id }),
            &[("b.txt", "text/plain", b"b".as_slice())],
        )
        .await;
    assert_eq!(ctx.storage.file_count(), 2);

    // Deleting one task sweeps its file
    let first_id = first["id"].as_str().unwrap();
    let (status, body) = ctx
        .request(
            Method::DELETE,
            &format!("/v1/projects/{project_id}/tasks/{first_id}"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    assert!(body["orphaned_files"].as_array().unwrap().is_empty());
    assert_eq!(ctx.storage.file_count(), 1);

    // Project deletion still proceeds when the sweep fails, reporting orphans
    ctx.storage.set_fail_deletes(true);
    let remaining_file = second["attachments"][0]["file_id"].as_str().unwrap();

    let (status, body) = ctx
        .request(
            Method::DELETE,
            &format!("/v1/projects/{project_id}"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    assert_eq!(
        body["orphaned_files"].as_array().unwrap(),
        &vec![serde_json::Value::String(remaining_file.to_string())]
    );

    ctx.storage.set_fail_deletes(false);
    ctx.cleanup().await.unwrap();
}
