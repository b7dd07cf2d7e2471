use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, Path, Query, State},
    http::{Request, StatusCode, header::LOCATION},
    response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image_cascade::{
    auth::{AuthenticatedUser, User},
    config::{AppConfig, ArchiveConfig, IdentityConfig, ProviderConfig},
    routes::{
        AppState, PageQuery, build_router, delete_image, list_images, list_public_images, login, publish_image,
        update_likes,
    },
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, path_regex},
};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01";

fn base_config(dir: &TempDir) -> AppConfig {
    AppConfig::new()
        .with_data_dir(dir.path())
        .with_providers(ProviderConfig::offline())
}

fn user(id: &str) -> AuthenticatedUser {
    AuthenticatedUser(User {
        id: id.to_string(),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
    })
}

fn body(value: Value) -> Bytes {
    Bytes::from(serde_json::to_vec(&value).unwrap())
}

fn publish_body(prompt: &str, image_url: &str, archive: bool) -> Bytes {
    body(json!({
        "prompt": prompt,
        "style": "anime",
        "aspectRatio": "1:1",
        "imageUrl": image_url,
        "provider": "Fal AI",
        "isPlaceholder": false,
        "archive": archive,
    }))
}

#[tokio::test]
async fn bearer_token_resolves_against_identity_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .and(header("X-Appwrite-Project", "proj-1"))
        .and(header("X-Appwrite-JWT", "good-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "$id": "user-1",
            "name": "Ada",
            "email": "ada@example.com",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .and(header("X-Appwrite-JWT", "stale-jwt"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let identity = IdentityConfig::default().with_endpoint(format!("{}/v1", server.uri()), "proj-1");
    let state = AppState::new(base_config(&dir).with_identity(identity));

    let (mut parts, ()) = Request::builder()
        .header("Authorization", "Bearer good-jwt")
        .body(())
        .unwrap()
        .into_parts();
    let AuthenticatedUser(found) = AuthenticatedUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(found.id, "user-1");
    assert_eq!(found.name, "Ada");

    let (mut parts, ()) = Request::builder()
        .header("Authorization", "Bearer stale-jwt")
        .body(())
        .unwrap()
        .into_parts();
    let err = AuthenticatedUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

    let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
    let err = AuthenticatedUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_redirects_to_provider() {
    let dir = tempfile::tempdir().unwrap();
    let identity = IdentityConfig::default()
        .with_endpoint("https://id.example.com/v1", "proj-1")
        .with_app_url("https://app.example.com");
    let state = AppState::new(base_config(&dir).with_identity(identity));

    let response = login(State(state.clone()), Path("google".to_string()))
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://id.example.com/v1/account/sessions/oauth2/google?project=proj-1"));
    assert!(location.contains("success=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"));

    let err = login(State(state), Path("myspace".to_string())).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let bare = AppState::new(base_config(&dir));
    let err = login(State(bare), Path("github".to_string())).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn owners_manage_their_records() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(base_config(&dir));

    let (status, created) = publish_image(
        State(state.clone()),
        user("alice"),
        publish_body("a fox", "https://x/fox.png", false),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let created = created.0;
    assert_eq!(created.user_id, "alice");
    assert!(created.archive_url.is_none());

    let mine = list_images(State(state.clone()), user("alice"), Query(PageQuery::default()))
        .await
        .unwrap()
        .0;
    assert_eq!(mine.len(), 1);
    let theirs = list_images(State(state.clone()), user("bob"), Query(PageQuery::default()))
        .await
        .unwrap()
        .0;
    assert!(theirs.is_empty());
    let public = list_public_images(State(state.clone()), Query(PageQuery::default()))
        .await
        .unwrap()
        .0;
    assert_eq!(public.len(), 1);

    let err = update_likes(
        State(state.clone()),
        user("bob"),
        Path(created.id.clone()),
        body(json!({ "likes": 3 })),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let liked = update_likes(
        State(state.clone()),
        user("alice"),
        Path(created.id.clone()),
        body(json!({ "likes": 3 })),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(liked.likes, 3);

    let err = delete_image(State(state.clone()), user("bob"), Path(created.id.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    let deleted = delete_image(State(state.clone()), user("alice"), Path(created.id.clone()))
        .await
        .unwrap()
        .0;
    assert!(deleted.success);
    let err = delete_image(State(state), user("alice"), Path(created.id))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn publish_rejects_blank_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(base_config(&dir));
    let err = publish_image(State(state), user("alice"), publish_body("  ", "https://x/y.png", false))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn publish_archives_inline_images() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/a-fox-\d+/image\.png$"))
        .and(header("x-archive-meta-creator", "User alice"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let archive = ArchiveConfig::default()
        .with_credentials("access-1", "secret-1")
        .with_base_urls(server.uri(), "https://archive.test/details");
    let state = AppState::new(base_config(&dir).with_archive(archive));

    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES));
    let (_, record) = publish_image(State(state), user("alice"), publish_body("A fox", &data_url, true))
        .await
        .unwrap();
    let archive_url = record.0.archive_url.unwrap();
    assert!(archive_url.starts_with("https://archive.test/details/a-fox-"));
}

#[tokio::test]
async fn archive_failure_still_publishes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fox.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_BYTES.to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let archive = ArchiveConfig::default()
        .with_credentials("access-1", "secret-1")
        .with_base_urls(server.uri(), "https://archive.test/details");
    let state = AppState::new(base_config(&dir).with_archive(archive));

    let image_url = format!("{}/fox.png", server.uri());
    let (status, record) = publish_image(State(state), user("alice"), publish_body("a fox", &image_url, true))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(record.0.archive_url.is_none());
    assert_eq!(record.0.image_url, image_url);
}

#[tokio::test]
async fn router_publishes_large_inline_images() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .and(header("X-Appwrite-JWT", "good-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "$id": "user-1",
            "name": "Ada",
            "email": "ada@example.com",
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let identity = IdentityConfig::default().with_endpoint(format!("{}/v1", server.uri()), "proj-1");
    let state = AppState::new(base_config(&dir).with_identity(identity));

    let mut image = PNG_BYTES.to_vec();
    image.resize(3 * 1024 * 1024, 0);
    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(&image));
    let response = build_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/images")
                .header("content-type", "application/json")
                .header("Authorization", "Bearer good-jwt")
                .body(Body::from(publish_body("a fox", &data_url, false)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}
