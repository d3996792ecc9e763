use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use ncit_api::auth::{AppState, AppStateInner};
use ncit_db::Database;
use ncit_gateway::Dispatcher;

struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "integration-test-secret".to_string(),
            token_ttl: Duration::days(1),
            dispatcher: Dispatcher::new(),
        });
        let router = ncit_api::router(state.clone());
        Self { state, router }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register an account and return (token, user id).
    async fn register(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "correct-horse",
                    "full_name": email.split('@').next().unwrap(),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["profile"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn register_admin(&self, email: &str) -> String {
        let (token, _) = self.register(email).await;
        assert!(self.state.db.promote_to_admin(email).unwrap());
        token
    }

    async fn published_blog(&self, author: &str, admin: &str) -> String {
        let (status, blog) = self
            .send(
                "POST",
                "/blogs",
                Some(author),
                Some(json!({
                    "title": "Exam tips",
                    "content": "## Plan ahead\n\nStart **early** and sleep well.",
                    "status": "pending",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = blog["id"].as_str().unwrap().to_string();

        let (status, _) = self
            .send("POST", &format!("/admin/blogs/{}/approve", id), Some(admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    async fn event(&self, admin: &str, max_participants: Option<i64>) -> String {
        let (status, event) = self
            .send(
                "POST",
                "/events",
                Some(admin),
                Some(json!({
                    "title": "Tech Talk",
                    "description": "Rust in production",
                    "event_date": (Utc::now() + Duration::days(5)).to_rfc3339(),
                    "location": "Seminar Hall",
                    "max_participants": max_participants,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create event failed: {}", event);
        event["id"].as_str().unwrap().to_string()
    }
}

// -- Auth --

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new();
    let (token, user_id) = app.register("ram@ncit.edu.np").await;

    let (status, body) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "RAM@ncit.edu.np", "password": "another-pass", "full_name": "Ram" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, _) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ram@ncit.edu.np", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ram@ncit.edu.np", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["role"], "student");

    let (status, body) = app.send("GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["email"], "ram@ncit.edu.np");

    let (status, body) = app.send("GET", "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn register_validates_input() {
    let app = TestApp::new();
    let (status, _) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "shorty@ncit.edu.np", "password": "short", "full_name": "S" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "long-enough", "full_name": "S" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_updates_and_public_view() {
    let app = TestApp::new();
    let (token, user_id) = app.register("gita@ncit.edu.np").await;

    let (status, body) = app
        .send(
            "PUT",
            "/profile",
            Some(&token),
            Some(json!({ "department": "Computer Engineering", "bio": "Likes compilers" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["department"], "Computer Engineering");

    let (status, body) = app.send("GET", &format!("/profiles/{}", user_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Likes compilers");
    assert!(body.get("email").is_none());
}

// -- Blogs & moderation --

#[tokio::test]
async fn pending_blog_is_published_only_through_moderation() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (author, _) = app.register("writer@ncit.edu.np").await;

    let (status, blog) = app
        .send(
            "POST",
            "/blogs",
            Some(&author),
            Some(json!({
                "title": "Campus Wi-Fi",
                "content": "The **new** access points are [live](https://ncit.edu.np).",
                "tags": [" Campus ", "campus", "Network"],
                "status": "pending",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(blog["status"], "pending");
    assert_eq!(blog["excerpt"], "The new access points are live.");
    assert_eq!(blog["tags"], json!(["campus", "network"]));
    let id = blog["id"].as_str().unwrap().to_string();

    // Not visible to the public yet
    let (_, list) = app.send("GET", "/blogs", None, None).await;
    assert_eq!(list.as_array().unwrap().len(), 0);
    let (status, _) = app.send("GET", &format!("/blogs/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("GET", &format!("/blogs/{}", id), Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);

    // Authors cannot publish themselves
    let (status, _) = app
        .send(
            "PUT",
            &format!("/blogs/{}", id),
            Some(&author),
            Some(json!({ "status": "published" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins were told about the submission
    let (_, admin_notes) = app.send("GET", "/notifications", Some(&admin), None).await;
    assert_eq!(admin_notes[0]["kind"], "blog_submitted");

    let (_, queue) = app.send("GET", "/admin/blogs", Some(&admin), None).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, approved) = app
        .send("POST", &format!("/admin/blogs/{}/approve", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "published");
    assert!(approved["published_at"].is_string());

    let (_, list) = app.send("GET", "/blogs?tag=network", None, None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, viewed) = app.send("GET", &format!("/blogs/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(viewed["views"], 1);

    let (_, notes) = app.send("GET", "/notifications", Some(&author), None).await;
    assert_eq!(notes[0]["kind"], "blog_approved");
    let (_, unread) = app.send("GET", "/notifications/unread-count", Some(&author), None).await;
    assert_eq!(unread["count"], 1);

    // Approving twice is refused
    let (status, _) = app
        .send("POST", &format!("/admin/blogs/{}/approve", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn rejection_needs_a_reason_and_can_be_resubmitted() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (author, _) = app.register("writer@ncit.edu.np").await;

    let (_, blog) = app
        .send(
            "POST",
            "/blogs",
            Some(&author),
            Some(json!({ "title": "Draft", "content": "Rough notes", "status": "pending" })),
        )
        .await;
    let id = blog["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            "POST",
            &format!("/admin/blogs/{}/reject", id),
            Some(&admin),
            Some(json!({ "reason": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rejected) = app
        .send(
            "POST",
            &format!("/admin/blogs/{}/reject", id),
            Some(&admin),
            Some(json!({ "reason": "Needs sources" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "archived");
    assert_eq!(rejected["rejection_reason"], "Needs sources");

    let (_, notes) = app.send("GET", "/notifications", Some(&author), None).await;
    assert_eq!(notes[0]["kind"], "blog_rejected");

    let (status, resubmitted) = app
        .send("POST", &format!("/blogs/{}/submit", id), Some(&author), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resubmitted["status"], "pending");
    assert!(resubmitted["rejection_reason"].is_null());
}

#[tokio::test]
async fn editing_a_published_blog_keeps_it_published_with_a_fresh_excerpt() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (author, _) = app.register("writer@ncit.edu.np").await;
    let id = app.published_blog(&author, &admin).await;
    let uri = format!("/blogs/{}", id);

    let (status, edited) = app
        .send(
            "PUT",
            &uri,
            Some(&author),
            Some(json!({ "content": "## Revised\n\nSleep **matters** more than cramming." })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "edit failed: {}", edited);
    assert_eq!(edited["status"], "published");
    assert_eq!(edited["excerpt"], "Revised Sleep matters more than cramming.");

    // An explicit excerpt wins over regeneration
    let (_, edited) = app
        .send(
            "PUT",
            &uri,
            Some(&author),
            Some(json!({ "content": "Shorter text", "excerpt": "Hand-written summary" })),
        )
        .await;
    assert_eq!(edited["excerpt"], "Hand-written summary");

    // A title-only edit leaves the excerpt alone
    let (_, edited) = app
        .send("PUT", &uri, Some(&author), Some(json!({ "title": "Exam tips, revised" })))
        .await;
    assert_eq!(edited["excerpt"], "Hand-written summary");

    let (status, public) = app.send("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["title"], "Exam tips, revised");
}

#[tokio::test]
async fn resubmitting_an_archived_blog_through_an_edit_clears_the_reason() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (author, _) = app.register("writer@ncit.edu.np").await;

    let (_, blog) = app
        .send(
            "POST",
            "/blogs",
            Some(&author),
            Some(json!({ "title": "Club news", "content": "Draft text", "status": "pending" })),
        )
        .await;
    let id = blog["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .send(
            "POST",
            &format!("/admin/blogs/{}/reject", id),
            Some(&admin),
            Some(json!({ "reason": "Too short" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Authors cannot publish their own work
    let (status, _) = app
        .send(
            "PUT",
            &format!("/blogs/{}", id),
            Some(&author),
            Some(json!({ "status": "published" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resubmitted) = app
        .send(
            "PUT",
            &format!("/blogs/{}", id),
            Some(&author),
            Some(json!({ "content": "A much longer account of club news", "status": "pending" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resubmitted["status"], "pending");
    assert!(resubmitted["rejection_reason"].is_null());
}

#[tokio::test]
async fn comments_on_unpublished_blogs_are_hidden() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (author, _) = app.register("writer@ncit.edu.np").await;
    let (reader, _) = app.register("reader@ncit.edu.np").await;
    let id = app.published_blog(&author, &admin).await;
    let comments = format!("/blogs/{}/comments", id);

    let (status, _) = app
        .send("POST", &comments, Some(&reader), Some(json!({ "content": "Great read" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(
            "PUT",
            &format!("/admin/blogs/{}/status", id),
            Some(&admin),
            Some(json!({ "status": "archived" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", &comments, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("GET", &comments, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, thread) = app.send("GET", &comments, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let app = TestApp::new();
    let (student, _) = app.register("student@ncit.edu.np").await;

    let (status, _) = app.send("GET", "/admin/stats", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send("GET", "/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Promotion takes effect without a new token
    assert!(app.state.db.promote_to_admin("student@ncit.edu.np").unwrap());
    let (status, stats) = app.send("GET", "/admin/stats", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["users"], 1);
}

#[tokio::test]
async fn likes_toggle() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (author, _) = app.register("writer@ncit.edu.np").await;
    let (reader, _) = app.register("reader@ncit.edu.np").await;
    let id = app.published_blog(&author, &admin).await;

    let (_, liked) = app.send("POST", &format!("/blogs/{}/like", id), Some(&reader), None).await;
    assert_eq!(liked, json!({ "liked": true, "likes": 1 }));
    let (_, unliked) = app.send("POST", &format!("/blogs/{}/like", id), Some(&reader), None).await;
    assert_eq!(unliked, json!({ "liked": false, "likes": 0 }));
}

// -- Events & registration --

#[tokio::test]
async fn registration_respects_capacity_and_duplicates() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (first, _) = app.register("first@ncit.edu.np").await;
    let (second, _) = app.register("second@ncit.edu.np").await;
    let event = app.event(&admin, Some(1)).await;
    let register = format!("/events/{}/register", event);

    let (status, body) = app.send("POST", &register, Some(&first), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["current_participants"], 1);

    let (status, body) = app.send("POST", &register, Some(&first), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already registered for this event");

    let (status, body) = app.send("POST", &register, Some(&second), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "event is full");

    let (_, notes) = app.send("GET", "/notifications", Some(&first), None).await;
    assert_eq!(notes[0]["kind"], "event_registration");

    let (status, _) = app.send("DELETE", &register, Some(&first), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send("DELETE", &register, Some(&first), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "registration not found");

    let (status, _) = app.send("POST", &register, Some(&second), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, registered) = app
        .send("GET", &format!("/events/{}/registration", event), Some(&second), None)
        .await;
    assert_eq!(registered["registered"], true);

    let (_, mine) = app.send("GET", "/me/registrations", Some(&second), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, registrants) = app
        .send("GET", &format!("/events/{}/registrations", event), Some(&admin), None)
        .await;
    assert_eq!(registrants[0]["email"], "second@ncit.edu.np");
}

#[tokio::test]
async fn cancelled_events_refuse_registrations_and_notify_attendees() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (attendee, _) = app.register("attendee@ncit.edu.np").await;
    let (latecomer, _) = app.register("late@ncit.edu.np").await;
    let event = app.event(&admin, None).await;

    let (status, _) = app
        .send("POST", &format!("/events/{}/register", event), Some(&attendee), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            "PUT",
            &format!("/events/{}/status", event),
            Some(&admin),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = app
        .send("POST", &format!("/events/{}/register", event), Some(&latecomer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, notes) = app.send("GET", "/notifications", Some(&attendee), None).await;
    assert_eq!(notes[0]["kind"], "event_cancelled");
}

#[tokio::test]
async fn event_updates_can_clear_optional_fields() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let event = app.event(&admin, Some(30)).await;
    let uri = format!("/events/{}", event);

    let (status, updated) = app
        .send("PUT", &uri, Some(&admin), Some(json!({ "location": "Main Hall" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["max_participants"], 30);
    assert_eq!(updated["location"], "Main Hall");

    let (status, updated) = app
        .send("PUT", &uri, Some(&admin), Some(json!({ "max_participants": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["max_participants"].is_null());
    assert_eq!(updated["location"], "Main Hall");
}

#[tokio::test]
async fn only_admins_create_events() {
    let app = TestApp::new();
    let (student, _) = app.register("student@ncit.edu.np").await;
    let (status, _) = app
        .send(
            "POST",
            "/events",
            Some(&student),
            Some(json!({
                "title": "Party",
                "description": "",
                "event_date": Utc::now().to_rfc3339(),
                "location": "Canteen",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Comments --

#[tokio::test]
async fn comments_thread_one_level_deep() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (author, _) = app.register("writer@ncit.edu.np").await;
    let (reader, _) = app.register("reader@ncit.edu.np").await;
    let blog = app.published_blog(&author, &admin).await;
    let comments = format!("/blogs/{}/comments", blog);

    let (status, root) = app
        .send("POST", &comments, Some(&reader), Some(json!({ "content": "Great tips" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let root_id = root["id"].as_str().unwrap().to_string();

    let (_, reply) = app
        .send(
            "POST",
            &comments,
            Some(&author),
            Some(json!({ "content": "Thanks!", "parent_id": root_id })),
        )
        .await;
    let reply_id = reply["id"].as_str().unwrap().to_string();

    let (_, nested) = app
        .send(
            "POST",
            &comments,
            Some(&reader),
            Some(json!({ "content": "You're welcome", "parent_id": reply_id })),
        )
        .await;
    assert_eq!(nested["parent_id"], root_id.as_str());

    let (status, threads) = app.send("GET", &comments, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let threads = threads.as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["replies"].as_array().unwrap().len(), 2);

    // The blog author heard about the comment, the commenter about the reply
    let (_, author_notes) = app.send("GET", "/notifications", Some(&author), None).await;
    assert!(
        author_notes
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["kind"] == "comment")
    );
    let (_, reader_notes) = app.send("GET", "/notifications", Some(&reader), None).await;
    assert_eq!(reader_notes[0]["kind"], "comment_reply");

    let (status, _) = app
        .send("POST", &comments, Some(&reader), Some(json!({ "content": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Someone else cannot edit the reader's comment
    let (status, _) = app
        .send(
            "PUT",
            &format!("/comments/{}", root_id),
            Some(&author),
            Some(json!({ "content": "edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("DELETE", &format!("/comments/{}", root_id), Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, threads) = app.send("GET", &comments, None, None).await;
    assert!(threads.as_array().unwrap().is_empty());
}

// -- Notifications & admin --

#[tokio::test]
async fn announcements_reach_everyone() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (student, _) = app.register("student@ncit.edu.np").await;

    let (status, body) = app
        .send(
            "POST",
            "/admin/announcements",
            Some(&admin),
            Some(json!({ "title": "Holiday", "message": "College closed on Friday" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sent"], 2);

    let (_, notes) = app.send("GET", "/notifications", Some(&student), None).await;
    let note_id = notes[0]["id"].as_str().unwrap().to_string();
    assert_eq!(notes[0]["kind"], "announcement");

    // Another user's notification is invisible to the admin
    let (status, _) = app
        .send("POST", &format!("/notifications/{}/read", note_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("POST", &format!("/notifications/{}/read", note_id), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, unread) = app.send("GET", "/notifications/unread-count", Some(&student), None).await;
    assert_eq!(unread["count"], 0);
}

#[tokio::test]
async fn admins_cannot_demote_or_delete_themselves() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;
    let (_, admin_id) = app.send("GET", "/auth/me", Some(&admin), None).await;
    let admin_id = admin_id["id"].as_str().unwrap().to_string();
    let (_, student_id) = app.register("student@ncit.edu.np").await;

    let (status, _) = app
        .send(
            "PUT",
            &format!("/admin/users/{}/role", admin_id),
            Some(&admin),
            Some(json!({ "role": "student" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("DELETE", &format!("/admin/users/{}", admin_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            "PUT",
            &format!("/admin/users/{}/role", student_id),
            Some(&admin),
            Some(json!({ "role": "faculty" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "faculty");

    let (status, _) = app
        .send("DELETE", &format!("/admin/users/{}", student_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn categories_are_seeded_and_managed_by_admins() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@ncit.edu.np").await;

    let (_, seeded) = app.send("GET", "/categories?kind=event", None, None).await;
    assert!(!seeded.as_array().unwrap().is_empty());

    let (status, created) = app
        .send(
            "POST",
            "/categories",
            Some(&admin),
            Some(json!({ "name": "Robotics", "kind": "event" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(
            "POST",
            "/categories",
            Some(&admin),
            Some(json!({ "name": "Robotics", "kind": "event" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            "DELETE",
            &format!("/categories/{}", created["id"].as_str().unwrap()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
