//! End-to-end checks against a running instance (needs a server on
//! localhost:8000 and a database behind it), hence all `#[ignore]`.
//! Run with: cargo test -- --ignored

use reqwest::StatusCode;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8000/api";

fn unique_email(tag: &str) -> String {
    format!(
        "{}-{}@example.com",
        tag,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    )
}

async fn sign_up(client: &reqwest::Client, email: &str, role: &str) -> reqwest::Response {
    client
        .post(format!("{}/auth/sign-up", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "hunter2222",
            "role": role
        }))
        .send()
        .await
        .unwrap()
}

async fn sign_in(client: &reqwest::Client, email: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/auth/sign-in", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn duplicate_email_sign_up_conflicts() {
    let client = reqwest::Client::new();
    let email = unique_email("dup");

    let first = sign_up(&client, &email, "client").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = sign_up(&client, &email, "client").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let body = second.json::<Value>().await.unwrap();
    assert_eq!(body["error"], "There is a user with that email already");
}

#[tokio::test]
#[ignore]
async fn sign_in_rejections_do_not_leak_which_part_was_wrong() {
    let client = reqwest::Client::new();
    let email = unique_email("login");

    sign_up(&client, &email, "client").await;

    let unknown_email = sign_in(&client, &unique_email("nobody"), "hunter2222").await;
    let wrong_password = sign_in(&client, &email, "not-the-password").await;

    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);

    let unknown_body = unknown_email.json::<Value>().await.unwrap();
    let wrong_body = wrong_password.json::<Value>().await.unwrap();
    assert_eq!(unknown_body, wrong_body);
}

#[tokio::test]
#[ignore]
async fn requests_with_a_garbage_token_proceed_unauthenticated() {
    let client = reqwest::Client::new();

    // Public route: the bad token must not break it.
    let listing = client
        .get(format!("{}/restaurants", BASE_URL))
        .header("x-jwt", "not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(listing.status(), StatusCode::OK);

    // Authenticated route: no user was attached, so 401.
    let me = client
        .get(format!("{}/users/me", BASE_URL))
        .header("x-jwt", "not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

async fn token_for(client: &reqwest::Client, email: &str, role: &str) -> String {
    sign_up(client, email, role).await;
    let body = sign_in(client, email, "hunter2222")
        .await
        .json::<Value>()
        .await
        .unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore]
async fn editing_an_unrelated_order_is_rejected() {
    let client = reqwest::Client::new();

    let owner_token = token_for(&client, &unique_email("owner"), "owner").await;
    let customer_token = token_for(&client, &unique_email("customer"), "client").await;
    let stranger_token = token_for(&client, &unique_email("stranger"), "client").await;

    let restaurant = client
        .post(format!("{}/restaurants", BASE_URL))
        .header("x-jwt", &owner_token)
        .json(&json!({
            "name": "Test Kitchen",
            "address": "1 Test St",
            "cover_image": "https://example.com/cover.png",
            "category_name": "Test Food"
        }))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    let restaurant_id = restaurant["id"].as_str().unwrap();

    let dish = client
        .post(format!("{}/dishes", BASE_URL))
        .header("x-jwt", &owner_token)
        .json(&json!({
            "restaurant_id": restaurant_id,
            "name": "Noodles",
            "description": "Plain noodles",
            "price": "9.5"
        }))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();

    let order = client
        .post(format!("{}/orders", BASE_URL))
        .header("x-jwt", &customer_token)
        .json(&json!({
            "restaurant_id": restaurant_id,
            "items": [{ "dish_id": dish["id"] }]
        }))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    let order_id = order["id"].as_str().unwrap();

    // A third party can't even see the order.
    let stranger_edit = client
        .patch(format!("{}/orders/{}", BASE_URL, order_id))
        .header("x-jwt", &stranger_token)
        .json(&json!({ "status": "cooking" }))
        .send()
        .await
        .unwrap();
    assert_eq!(stranger_edit.status(), StatusCode::FORBIDDEN);

    // The customer participates but the status gate still rejects them.
    let customer_edit = client
        .patch(format!("{}/orders/{}", BASE_URL, order_id))
        .header("x-jwt", &customer_token)
        .json(&json!({ "status": "cooking" }))
        .send()
        .await
        .unwrap();
    assert_eq!(customer_edit.status(), StatusCode::FORBIDDEN);

    let body = customer_edit.json::<Value>().await.unwrap();
    assert_eq!(body["error"], "You can't do that");

    // The owner may start cooking.
    let owner_edit = client
        .patch(format!("{}/orders/{}", BASE_URL, order_id))
        .header("x-jwt", &owner_token)
        .json(&json!({ "status": "cooking" }))
        .send()
        .await
        .unwrap();
    assert_eq!(owner_edit.status(), StatusCode::OK);
}
