use std::time::Duration;

use actix_web::{test, web, App};
use flock::config::Config;
use flock::context::Services;
use flock::core::memory::MemoryStore;
use flock::server;
use serde_json::{json, Value};

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(Services::new(
                    MemoryStore::new(),
                    &Config::with_secret("integration-secret"),
                )))
                .configure(server::routes::<MemoryStore>),
        )
        .await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status().as_u16();
        let body = test::read_body(resp).await;
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }};
}

macro_rules! register {
    ($app:expr, $name:expr) => {{
        let name: &str = $name;
        let (status, user) = send!(
            $app,
            test::TestRequest::post().uri("/users").set_json(json!({
                "username": name,
                "email": format!("{name}@example.com"),
                "password": "password123"
            }))
        );
        assert_eq!(status, 201, "register {name}: {user}");
        user
    }};
}

macro_rules! login {
    ($app:expr, $name:expr) => {{
        let name: &str = $name;
        let (status, body) = send!(
            $app,
            test::TestRequest::post().uri("/login").set_json(json!({
                "email": format!("{name}@example.com"),
                "password": "password123"
            }))
        );
        assert_eq!(status, 200, "login {name}: {body}");
        format!("Bearer {}", body["token"].as_str().unwrap())
    }};
}

fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

#[actix_web::test]
async fn test_full_user_flow() {
    let app = app!();

    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    assert!(alice.get("password").is_none());
    assert_eq!(alice["username"], "alice");

    let alice_auth = login!(app, "alice");
    let bob_auth = login!(app, "bob");
    assert_eq!(alice_auth.trim_start_matches("Bearer ").split('.').count(), 3);

    let (status, profile) = send!(app, test::TestRequest::get().uri("/profile").insert_header(("Authorization", alice_auth.as_str())));
    assert_eq!(status, 200);
    assert_eq!(profile["id"], alice["id"]);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/follow")
            .insert_header(("Authorization", alice_auth.as_str()))
            .set_json(json!({"user_id": bob["id"]}))
    );
    assert_eq!((status, body), (200, json!(true)));

    let (_, post1) = send!(
        app,
        test::TestRequest::post()
            .uri("/posts")
            .insert_header(("Authorization", bob_auth.as_str()))
            .set_json(json!({"text": "Post 1"}))
    );
    assert_eq!(post1["author_id"], bob["id"]);
    tokio::time::sleep(Duration::from_millis(5)).await;

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/posts")
            .insert_header(("Authorization", alice_auth.as_str()))
            .set_json(json!({"text": "Post 2", "media_url": null}))
    );
    assert_eq!(status, 201);

    let (status, timeline) = send!(app, test::TestRequest::get().uri("/timeline").insert_header(("Authorization", alice_auth.as_str())));
    assert_eq!(status, 200);
    let texts: Vec<&str> = timeline.as_array().unwrap().iter().filter_map(|p| p["text"].as_str()).collect();
    assert_eq!(texts, vec!["Post 2", "Post 1"]);

    let bob_id = bob["id"].as_str().unwrap();
    let alice_id = alice["id"].as_str().unwrap();

    let (_, following) = send!(app, test::TestRequest::get().uri(&format!("/following/{alice_id}")));
    assert_eq!(following.as_array().unwrap().len(), 1);
    assert_eq!(following[0]["id"], bob["id"]);
    assert!(following[0].get("password").is_none());

    let (_, followers) = send!(app, test::TestRequest::get().uri(&format!("/followers/{bob_id}")));
    assert_eq!(followers[0]["username"], "alice");

    let (status, bob_posts) = send!(app, test::TestRequest::get().uri(&format!("/posts?user={bob_id}")));
    assert_eq!(status, 200);
    assert_eq!(bob_posts.as_array().unwrap().len(), 1);

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/unfollow")
            .insert_header(("Authorization", alice_auth.as_str()))
            .set_json(json!({"user_id": bob_id}))
    );
    assert_eq!(status, 200);

    let (_, following) = send!(app, test::TestRequest::get().uri(&format!("/following/{alice_id}")));
    assert_eq!(following, json!([]));

    let (status, user) = send!(app, test::TestRequest::get().uri(&format!("/users/{bob_id}")));
    assert_eq!(status, 200);
    assert_eq!(user["email"], "bob@example.com");
}

#[actix_web::test]
async fn test_protected_operations_require_login() {
    let app = app!();
    let target = register!(app, "target");

    let cases = [
        (test::TestRequest::post().uri("/follow").set_json(json!({"user_id": target["id"]})), "You must be logged in to follow users"),
        (test::TestRequest::post().uri("/unfollow").set_json(json!({"user_id": target["id"]})), "You must be logged in to unfollow users"),
        (test::TestRequest::post().uri("/posts").set_json(json!({"text": "hi"})), "You must be logged in to create a post"),
        (test::TestRequest::get().uri("/timeline"), "You must be logged in to view your timeline"),
        (test::TestRequest::get().uri("/profile"), "You must be logged in to view your profile"),
    ];
    for (req, message) in cases {
        let (status, body) = send!(app, req);
        assert_eq!(status, 401);
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
        assert_eq!(error_message(&body), message);
    }

    // a bad token is an anonymous caller, not a different error
    let (status, body) = send!(
        app,
        test::TestRequest::get().uri("/timeline").insert_header(("Authorization", "Bearer garbage"))
    );
    assert_eq!(status, 401);
    assert_eq!(error_message(&body), "You must be logged in to view your timeline");
}

#[actix_web::test]
async fn test_registration_and_login_errors() {
    let app = app!();
    register!(app, "dup");

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/users").set_json(json!({
            "username": "dup2", "email": "dup@example.com", "password": "x"
        }))
    );
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(error_message(&body), "User with this email or username already exists");

    let (status, unknown) = send!(
        app,
        test::TestRequest::post().uri("/login").set_json(json!({"email": "nobody@example.com", "password": "password123"}))
    );
    assert_eq!(status, 401);
    let (status, wrong) = send!(
        app,
        test::TestRequest::post().uri("/login").set_json(json!({"email": "dup@example.com", "password": "wrong"}))
    );
    assert_eq!(status, 401);
    assert_eq!(unknown, wrong);
    assert_eq!(error_message(&wrong), "Invalid email or password");
}

#[actix_web::test]
async fn test_follow_rules() {
    let app = app!();
    let me = register!(app, "me");
    let other = register!(app, "other");
    let auth = login!(app, "me");

    let follow = |id: &Value| {
        test::TestRequest::post()
            .uri("/follow")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({"user_id": id}))
    };

    let (status, body) = send!(app, follow(&me["id"]));
    assert_eq!(status, 400);
    assert_eq!(error_message(&body), "You cannot follow yourself");

    let (status, _) = send!(app, follow(&other["id"]));
    assert_eq!(status, 200);
    let (status, body) = send!(app, follow(&other["id"]));
    assert_eq!(status, 400);
    assert_eq!(error_message(&body), "You are already following this user");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/unfollow")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({"user_id": uuid::Uuid::new_v4().to_string()}))
    );
    assert_eq!(status, 400);
    assert_eq!(error_message(&body), "You are not following this user");
}

#[actix_web::test]
async fn test_follow_checks_login_before_body() {
    let app = app!();
    register!(app, "reader");
    let auth = login!(app, "reader");

    for (path, message) in [
        ("/follow", "You must be logged in to follow users"),
        ("/unfollow", "You must be logged in to unfollow users"),
    ] {
        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri(path)
                .insert_header(("Content-Type", "application/json"))
                .set_payload("{broken")
        );
        assert_eq!(status, 401, "{path}");
        assert_eq!(error_message(&body), message);

        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri(path)
                .insert_header(("Authorization", auth.as_str()))
                .insert_header(("Content-Type", "application/json"))
                .set_payload("{broken")
        );
        assert_eq!(status, 400, "{path}");
        assert_eq!(error_message(&body), "Invalid request body");
    }
}

#[actix_web::test]
async fn test_post_validation_and_routing() {
    let app = app!();
    register!(app, "writer");
    let auth = login!(app, "writer");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/posts")
            .insert_header(("Authorization", auth.as_str()))
            .set_json(json!({"text": null, "media_url": null}))
    );
    assert_eq!(status, 400);
    assert_eq!(error_message(&body), "A post must have either text or a media URL.");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/posts")
            .insert_header(("Authorization", auth.as_str()))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(status, 400);
    assert_eq!(error_message(&body), "Invalid request body");

    let (status, _) = send!(app, test::TestRequest::get().uri("/posts"));
    assert_eq!(status, 400);

    let (status, body) = send!(app, test::TestRequest::get().uri("/nowhere"));
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
