/// Integration tests for projects, membership, and role enforcement
///
/// Covers:
/// - Project CRUD and the creator's automatic admin membership
/// - Member management by email, role updates, and removal
/// - The role matrix across tasks and notes, including single-note reads
/// - The last-admin invariant on demote, remove, and leave

mod common;

use axum::http::{Method, StatusCode};
use common::TestContext;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_project_crud_and_creator_membership() {
    let ctx = TestContext::new().await.unwrap();

    let owner = ctx.signup("owner").await.unwrap();
    let project_id = ctx.create_project(&owner.token, "Launch plan").await;

    // Creator is the first admin
    let (status, body) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Launch plan");
    assert_eq!(body["role"], "admin");

    // Listing shows the project with a member count of one
    let (status, body) = ctx
        .request(Method::GET, "/v1/projects", Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = body
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == project_id.to_string())
        .unwrap();
    assert_eq!(listed["member_count"], 1);

    // Rename
    let (status, body) = ctx
        .request(
            Method::PUT,
            &format!("/v1/projects/{project_id}"),
            Some(&owner.token),
            Some(json!({ "name": "Launch plan v2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Launch plan v2");

    // Delete
    let (status, body) = ctx
        .request(
            Method::DELETE,
            &format!("/v1/projects/{project_id}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_member_management_by_email() {
    let ctx = TestContext::new().await.unwrap();

    let owner = ctx.signup("owner").await.unwrap();
    let colleague = ctx.signup("colleague").await.unwrap();
    let project_id = ctx.create_project(&owner.token, "Hiring").await;

    // Unknown email is a 404
    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{project_id}/members"),
            Some(&owner.token),
            Some(json!({ "email": "nobody@example.com", "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.add_member(&owner.token, project_id, &colleague.user.email, "member")
        .await;

    // Adding the same user twice conflicts
    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{project_id}/members"),
            Some(&owner.token),
            Some(json!({ "email": colleague.user.email, "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Both show up in the listing with their profiles
    let (status, body) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}/members"),
            Some(&colleague.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Promote to project_admin
    let (status, body) = ctx
        .request(
            Method::PUT,
            &format!("/v1/projects/{project_id}/members/{}", colleague.user.id),
            Some(&owner.token),
            Some(json!({ "role": "project_admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "project_admin");

    // Remove
    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("/v1/projects/{project_id}/members/{}", colleague.user.id),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}"),
            Some(&colleague.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_role_matrix_for_tasks_and_notes() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let manager = ctx.signup("manager").await.unwrap();
    let worker = ctx.signup("worker").await.unwrap();
    let outsider = ctx.signup("outsider").await.unwrap();

    let project_id = ctx.create_project(&admin.token, "Matrix").await;
    ctx.add_member(&admin.token, project_id, &manager.user.email, "project_admin")
        .await;
    ctx.add_member(&admin.token, project_id, &worker.user.email, "member")
        .await;

    let task_payload = |title: &str, assignee: Uuid| {
        json!({ "title": title, "assigned_to": assignee })
    };

    // Plain members cannot create tasks
    let (status, _) = ctx
        .multipart_request(
            &format!("/v1/projects/{project_id}/tasks"),
            &worker.token,
            &task_payload("Sneaky", worker.user.id),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Project admins can
    let (status, _) = ctx
        .multipart_request(
            &format!("/v1/projects/{project_id}/tasks"),
            &manager.token,
            &task_payload("Legit", worker.user.id),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Notes are writable by admins only
    let note_uri = format!("/v1/projects/{project_id}/notes");
    for token in [&manager.token, &worker.token] {
        let (status, _) = ctx
            .request(
                Method::POST,
                &note_uri,
                Some(token),
                Some(json!({ "content": "meeting minutes" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = ctx
        .request(
            Method::POST,
            &note_uri,
            Some(&admin.token),
            Some(json!({ "content": "meeting minutes" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // But every member can read them
    for token in [&admin.token, &manager.token, &worker.token] {
        let (status, body) = ctx.request(Method::GET, &note_uri, Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    // Non-members see nothing; unknown projects are a 404, not a 403
    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}"),
            Some(&outsider.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{}", Uuid::new_v4()),
            Some(&outsider.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_single_note_read() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("note-admin").await.unwrap();
    let member = ctx.signup("note-reader").await.unwrap();
    let outsider = ctx.signup("note-outsider").await.unwrap();

    let project_id = ctx.create_project(&admin.token, "Minutes").await;
    ctx.add_member(&admin.token, project_id, &member.user.email, "member")
        .await;

    let (status, body) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{project_id}/notes"),
            Some(&admin.token),
            Some(json!({ "content": "standup notes" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let note_id = body["id"].as_str().unwrap().to_string();

    // Any member can fetch a single note, editor profile included
    let note_uri = format!("/v1/projects/{project_id}/notes/{note_id}");
    let (status, body) = ctx
        .request(Method::GET, &note_uri, Some(&member.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "standup notes");
    assert_eq!(
        body["last_editor"]["id"],
        admin.user.id.to_string()
    );

    // Outsiders cannot
    let (status, _) = ctx
        .request(Method::GET, &note_uri, Some(&outsider.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown note IDs are a 404
    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}/notes/{}", Uuid::new_v4()),
            Some(&member.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_last_admin_cannot_be_lost() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("solo-admin").await.unwrap();
    let member = ctx.signup("member").await.unwrap();

    let project_id = ctx.create_project(&admin.token, "Fortress").await;
    ctx.add_member(&admin.token, project_id, &member.user.email, "member")
        .await;

    // Demoting the only admin is refused
    let (status, _) = ctx
        .request(
            Method::PUT,
            &format!("/v1/projects/{project_id}/members/{}", admin.user.id),
            Some(&admin.token),
            Some(json!({ "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // So is leaving
    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{project_id}/leave"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // After promoting a second admin, the original can step down
    let (status, _) = ctx
        .request(
            Method::PUT,
            &format!("/v1/projects/{project_id}/members/{}", member.user.id),
            Some(&admin.token),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{project_id}/leave"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_leaving_deletes_the_leavers_tasks() {
    let ctx = TestContext::new().await.unwrap();

    let admin = ctx.signup("admin").await.unwrap();
    let member = ctx.signup("member").await.unwrap();

    let project_id = ctx.create_project(&admin.token, "Handover").await;
    ctx.add_member(&admin.token, project_id, &member.user.email, "member")
        .await;

    ctx.create_task(
        &admin.token,
        project_id,
        json!({ "title": "Their task", "assigned_to": member.user.id }),
    )
    .await;
    ctx.create_task(
        &admin.token,
        project_id,
        json!({ "title": "My task", "assigned_to": admin.user.id }),
    )
    .await;

    let (status, body) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{project_id}/leave"),
            Some(&member.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasks_deleted"], 1);

    // Only the admin's own task remains
    let (status, body) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{project_id}/tasks"),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "My task");

    ctx.cleanup().await.unwrap();
}
