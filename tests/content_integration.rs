mod common;

use common::spawn_app;
use serde_json::{json, Value};

// --- Blog Tests ---

#[tokio::test]
async fn admin_creates_blog_with_sanitized_content() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;

    let response = app
        .post(
            "/blogs",
            &admin.access_token,
            &json!({
                "title": "Hello World",
                "content": "<p>Hi</p><script>alert('x')</script>",
                "status": "published"
            }),
        )
        .await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let blog = &body["blog"];
    assert_eq!(blog["title"], "Hello World");
    assert_eq!(blog["authorId"], admin.id.as_str());
    assert!(blog["slug"].as_str().unwrap().starts_with("hello-world-"));
    assert!(blog["content"].as_str().unwrap().contains("<p>Hi</p>"));
    assert!(!blog["content"].as_str().unwrap().contains("<script"));
    assert!(blog["publishedAt"].is_string());
}

#[tokio::test]
async fn user_role_cannot_create_blogs() {
    let app = spawn_app().await;
    let user = app.register("jane@example.com", None).await;

    let response = app
        .post(
            "/blogs",
            &user.access_token,
            &json!({ "title": "Nope", "content": "<p>Nope</p>" }),
        )
        .await;

    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "AuthorizationError");
}

#[tokio::test]
async fn drafts_are_hidden_from_users() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let user = app.register("jane@example.com", None).await;

    let draft = app.create_blog(&admin, "Draft post", "draft").await;
    app.create_blog(&admin, "Published post", "published").await;

    let slug = draft["slug"].as_str().unwrap();
    let response = app.get(&format!("/blogs/{}", slug), &user.access_token).await;
    assert_eq!(404, response.status().as_u16());
    let response = app.get(&format!("/blogs/{}", slug), &admin.access_token).await;
    assert_eq!(200, response.status().as_u16());

    let response = app.get("/blogs", &user.access_token).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["blogs"][0]["title"], "Published post");

    let response = app.get("/blogs", &admin.access_token).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn reading_a_published_blog_counts_views() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let user = app.register("jane@example.com", None).await;
    let blog = app.create_blog(&admin, "Popular", "published").await;
    let path = format!("/blogs/{}", blog["slug"].as_str().unwrap());

    let response = app.get(&path, &user.access_token).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["blog"]["viewsCount"], 1);

    let response = app.get(&path, &admin.access_token).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["blog"]["viewsCount"], 2);

    let draft = app.create_blog(&admin, "Hidden", "draft").await;
    let path = format!("/blogs/{}", draft["slug"].as_str().unwrap());
    app.get(&path, &admin.access_token).await;
    let response = app.get(&path, &admin.access_token).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["blog"]["viewsCount"], 0);
}

#[tokio::test]
async fn only_the_author_can_update_a_blog() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let blog = app.create_blog(&admin, "Original", "draft").await;
    let path = format!("/blogs/{}", blog["id"].as_str().unwrap());

    let response = app
        .put(&path, &admin.access_token, &json!({ "title": "Renamed", "status": "published" }))
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["blog"]["title"], "Renamed");
    assert_eq!(body["blog"]["status"], "published");
    assert!(body["blog"]["publishedAt"].is_string());

    let user = app.register("jane@example.com", None).await;
    let response = app
        .put(&path, &user.access_token, &json!({ "title": "Hijacked" }))
        .await;
    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn deleting_a_blog_removes_it_and_its_comments() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let blog = app.create_blog(&admin, "Short lived", "published").await;
    let blog_id = blog["id"].as_str().unwrap();

    let response = app
        .post(
            &format!("/comments/blog/{}", blog_id),
            &admin.access_token,
            &json!({ "content": "first" }),
        )
        .await;
    assert_eq!(201, response.status().as_u16());

    let response = app.delete(&format!("/blogs/{}", blog_id), &admin.access_token).await;
    assert_eq!(204, response.status().as_u16());

    let slug = blog["slug"].as_str().unwrap();
    let response = app.get(&format!("/blogs/{}", slug), &admin.access_token).await;
    assert_eq!(404, response.status().as_u16());

    let response = app
        .get(&format!("/comments/blog/{}", blog_id), &admin.access_token)
        .await;
    assert_eq!(404, response.status().as_u16());
}

// --- Comment Tests ---

#[tokio::test]
async fn comments_update_the_blog_counter() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let user = app.register("jane@example.com", None).await;
    let blog = app.create_blog(&admin, "Discuss", "published").await;
    let blog_id = blog["id"].as_str().unwrap();

    let response = app
        .post(
            &format!("/comments/blog/{}", blog_id),
            &user.access_token,
            &json!({ "content": "<b>nice</b><script>x</script>" }),
        )
        .await;
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let comment_id = body["comment"]["id"].as_str().unwrap().to_string();
    assert!(!body["comment"]["content"].as_str().unwrap().contains("<script"));

    let response = app
        .get(&format!("/comments/blog/{}", blog_id), &user.access_token)
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);

    let slug = blog["slug"].as_str().unwrap();
    let response = app.get(&format!("/blogs/{}", slug), &user.access_token).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["blog"]["commentsCount"], 1);

    let response = app
        .delete(&format!("/comments/{}", comment_id), &user.access_token)
        .await;
    assert_eq!(204, response.status().as_u16());

    let response = app.get(&format!("/blogs/{}", slug), &user.access_token).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["blog"]["commentsCount"], 0);
}

#[tokio::test]
async fn users_cannot_delete_each_others_comments() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let jane = app.register("jane@example.com", None).await;
    let bob = app.register("bob@example.com", None).await;
    let blog = app.create_blog(&admin, "Discuss", "published").await;

    let response = app
        .post(
            &format!("/comments/blog/{}", blog["id"].as_str().unwrap()),
            &jane.access_token,
            &json!({ "content": "mine" }),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    let path = format!("/comments/{}", body["comment"]["id"].as_str().unwrap());

    assert_eq!(403, app.delete(&path, &bob.access_token).await.status().as_u16());
    assert_eq!(204, app.delete(&path, &admin.access_token).await.status().as_u16());
    assert_eq!(404, app.delete(&path, &jane.access_token).await.status().as_u16());
}

#[tokio::test]
async fn overlong_comment_is_rejected() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let blog = app.create_blog(&admin, "Discuss", "published").await;

    let response = app
        .post(
            &format!("/comments/blog/{}", blog["id"].as_str().unwrap()),
            &admin.access_token,
            &json!({ "content": "a".repeat(1001) }),
        )
        .await;

    assert_eq!(400, response.status().as_u16());
}

// --- Like Tests ---

#[tokio::test]
async fn a_blog_can_only_be_liked_once_per_user() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let user = app.register("jane@example.com", None).await;
    let blog = app.create_blog(&admin, "Likeable", "published").await;
    let path = format!("/likes/blog/{}", blog["id"].as_str().unwrap());

    let response = app.post(&path, &user.access_token, &json!({})).await;
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["likesCount"], 1);

    let response = app.post(&path, &user.access_token, &json!({})).await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You already liked this blog");

    let response = app.delete(&path, &user.access_token).await;
    assert_eq!(204, response.status().as_u16());

    let response = app.delete(&path, &user.access_token).await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Like not found");
}

// --- Account Tests ---

#[tokio::test]
async fn profile_update_validates_and_persists() {
    let app = spawn_app().await;
    let user = app.register("jane@example.com", None).await;

    let response = app
        .put(
            "/users/current",
            &user.access_token,
            &json!({ "website": "not a url", "firstName": "Jane" }),
        )
        .await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["errors"]["website"].is_string());

    let response = app
        .put(
            "/users/current",
            &user.access_token,
            &json!({ "username": "jane_doe", "firstName": "Jane", "website": "https://jane.dev" }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], "jane_doe");
    assert_eq!(body["user"]["firstName"], "Jane");
    assert_eq!(body["user"]["socialLinks"]["website"], "https://jane.dev");

    let other = app.register("bob@example.com", None).await;
    let response = app
        .put("/users/current", &other.access_token, &json!({ "username": "jane_doe" }))
        .await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn deleting_an_account_cascades() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let user = app.register("jane@example.com", None).await;
    let blog = app.create_blog(&admin, "Popular", "published").await;
    let blog_id = blog["id"].as_str().unwrap();

    app.post(&format!("/likes/blog/{}", blog_id), &user.access_token, &json!({}))
        .await;
    app.post(
        &format!("/comments/blog/{}", blog_id),
        &user.access_token,
        &json!({ "content": "hello" }),
    )
    .await;

    let response = app.delete("/users/current", &user.access_token).await;
    assert_eq!(204, response.status().as_u16());

    // Sessions are revoked and the account is gone
    assert_eq!(401, app.post_refresh(Some(&user.refresh_token)).await.status().as_u16());
    assert_eq!(404, app.get("/users/current", &user.access_token).await.status().as_u16());

    let slug = blog["slug"].as_str().unwrap();
    let response = app.get(&format!("/blogs/{}", slug), &admin.access_token).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["blog"]["likesCount"], 0);
    assert_eq!(body["blog"]["commentsCount"], 0);
}

#[tokio::test]
async fn admin_can_delete_other_users() {
    let app = spawn_app().await;
    let admin = app.register_admin().await;
    let user = app.register("jane@example.com", None).await;
    let path = format!("/users/{}", user.id);

    assert_eq!(204, app.delete(&path, &admin.access_token).await.status().as_u16());
    assert_eq!(404, app.delete(&path, &admin.access_token).await.status().as_u16());
    assert_eq!(401, app.post_refresh(Some(&user.refresh_token)).await.status().as_u16());
}
