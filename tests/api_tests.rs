mod common;

use autovm::config::RegistrationMode;
use reqwest::StatusCode;
use serde_json::json;

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

// ── Registration & Auth ─────────────────────────────────────────

#[tokio::test]
async fn first_user_is_admin_then_customers() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.register("Second@Test.com", common::PASSWORD, "Second").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "customer");
    assert_eq!(body["user"]["email"], "second@test.com");
    assert!(body["user"].get("password_hash").is_none());

    let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(customers, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn closed_registration_rejects_second_user() {
    let app = common::spawn_app_with(RegistrationMode::Closed).await;
    app.bootstrap().await;

    let (body, status) = app.register("other@test.com", common::PASSWORD, "Other").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("disabled"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_duplicate_and_short_password() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.register("admin@test.com", common::PASSWORD, "Again").await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (body, status) = app.register("short@test.com", "short", "Short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["password"].is_array());

    common::cleanup(app).await;
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_valid_and_invalid_credentials() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.login("ADMIN@test.com", common::PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    let (_, status) = app.login("admin@test.com", "wrongpassword").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app.login("nobody@test.com", common::PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_is_rate_limited_after_repeated_failures() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    for _ in 0..5 {
        let (_, status) = app.login("admin@test.com", "wrongpassword").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (_, status) = app.login("admin@test.com", common::PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    common::cleanup(app).await;
}

#[tokio::test]
async fn protected_endpoints_require_token() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/api/v1/users/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (_, status) = app.get_auth("/api/v1/users/me", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

// ── Token Refresh ───────────────────────────────────────────────

#[tokio::test]
async fn refresh_token_rotation_and_reuse_detection() {
    let app = common::spawn_app().await;
    app.bootstrap().await;
    let (login_body, _) = app.login("admin@test.com", common::PASSWORD).await;
    let refresh = login_body["refresh_token"].as_str().unwrap();

    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .header("cookie", format!("refresh_token={refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    let rotated = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, refresh);

    // Replaying the first token revokes every session, including the rotated one
    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .header("cookie", format!("refresh_token={refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("reuse"));

    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .header("cookie", format!("refresh_token={rotated}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn logout_invalidates_refresh_token() {
    let app = common::spawn_app().await;
    app.bootstrap().await;
    let (login_body, _) = app.login("admin@test.com", common::PASSWORD).await;
    let refresh = login_body["refresh_token"].as_str().unwrap();

    let resp = app
        .client
        .post(app.url("/api/v1/auth/logout"))
        .header("cookie", format!("refresh_token={refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .header("cookie", format!("refresh_token={refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

// ── Deposit & Balance ───────────────────────────────────────────

#[tokio::test]
async fn deposit_opens_account_and_credits_balance() {
    let app = common::spawn_app().await;
    app.bootstrap().await;
    let (token, _) = app.customer("payer@test.com").await;

    let (body, status) = app.deposit(&token, json!(50)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Successfully deposited 50 into your account");

    let (body, status) = app.balance(&token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "50.00");

    let (_, status) = app.deposit(&token, json!("12.50")).await;
    assert_eq!(status, StatusCode::OK);
    let (body, _) = app.balance(&token).await;
    assert_eq!(body["balance"], "62.50");

    // Each deposit leaves exactly one completed ledger entry
    let (list, status) = app.get_auth("/api/v1/transactions", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 2);
    assert!(list["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|t| t["status"] == "completed"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn deposit_rejects_bad_amounts() {
    let app = common::spawn_app().await;
    app.bootstrap().await;
    let (token, _) = app.customer("payer@test.com").await;

    for amount in [
        json!(null),
        json!(0),
        json!(-5),
        json!("abc"),
        json!("1.234"),
        json!("1000000000000"),
        json!(1e20),
    ] {
        let (body, status) = app.deposit(&token, amount.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}: {body}");
        assert!(body["fields"]["amount"].is_array());
    }

    let (_, status) = app
        .post_auth("/api/v1/billing-accounts/deposit", &token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was opened along the way
    let (_, status) = app.balance(&token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn deposit_past_balance_limit_is_rejected() {
    let app = common::spawn_app().await;
    app.bootstrap().await;
    let (token, _) = app.customer("whale@test.com").await;

    let (body, status) = app.deposit(&token, json!("999999999999.99")).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (body, status) = app.deposit(&token, json!("0.01")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["fields"]["amount"].is_array());

    let (body, _) = app.balance(&token).await;
    assert_eq!(body["balance"], "999999999999.99");

    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(entries, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn balance_without_account_is_not_found() {
    let app = common::spawn_app().await;
    app.bootstrap().await;
    let (token, _) = app.customer("fresh@test.com").await;

    let (body, status) = app.balance(&token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM billing_accounts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(accounts, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn failed_ledger_write_leaves_balance_untouched() {
    let app = common::spawn_app().await;
    app.bootstrap().await;
    let (token, _) = app.customer("atomic@test.com").await;

    let (_, status) = app.deposit(&token, json!(20)).await;
    assert_eq!(status, StatusCode::OK);

    sqlx::raw_sql(
        "CREATE FUNCTION reject_ledger() RETURNS trigger AS $$
         BEGIN RAISE EXCEPTION 'ledger unavailable'; END;
         $$ LANGUAGE plpgsql;
         CREATE TRIGGER reject_ledger BEFORE INSERT ON transactions
         FOR EACH ROW EXECUTE FUNCTION reject_ledger();",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let (body, status) = app.deposit(&token, json!(30)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");

    let (body, _) = app.balance(&token).await;
    assert_eq!(body["balance"], "20.00");

    common::cleanup(app).await;
}

// ── Transactions ────────────────────────────────────────────────

#[tokio::test]
async fn transactions_are_scoped_to_their_owner() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (alice, _) = app.customer("alice@test.com").await;
    let (bob, _) = app.customer("bob@test.com").await;

    app.deposit(&alice, json!(10)).await;
    app.deposit(&alice, json!(15)).await;
    app.deposit(&bob, json!(99)).await;

    let (list, _) = app.get_auth("/api/v1/transactions", &alice).await;
    assert_eq!(list["total"], 2);
    let (list, _) = app.get_auth("/api/v1/transactions", &bob).await;
    assert_eq!(list["total"], 1);
    let bob_tx = list["results"][0]["id"].as_str().unwrap().to_string();

    let (list, _) = app.get_auth("/api/v1/transactions", &admin).await;
    assert_eq!(list["total"], 3);

    let (_, status) = app
        .get_auth(&format!("/api/v1/transactions/{bob_tx}"), &alice)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (list, _) = app
        .get_auth("/api/v1/transactions?account_user_email=bob@test.com", &admin)
        .await;
    assert_eq!(list["total"], 1);

    let (list, status) = app
        .get_auth(
            "/api/v1/transactions?page=9223372036854775807&per_page=100",
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{list}");
    assert_eq!(list["total"], 3);
    assert_eq!(list["results"].as_array().map(Vec::len), Some(0));

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_adjustment_moves_balance_with_entry() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (token, _) = app.customer("adjust@test.com").await;
    app.deposit(&token, json!(40)).await;

    let (accounts, _) = app.get_auth("/api/v1/billing-accounts", &token).await;
    let account_id = accounts["results"][0]["id"].as_str().unwrap().to_string();

    let (body, status) = app
        .post_auth(
            "/api/v1/transactions",
            &admin,
            &json!({ "account_id": account_id, "amount": "-15.25" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["balance"], "24.75");
    let entry = body["transaction"]["id"].as_str().unwrap().to_string();

    let (body, status) = app
        .put_auth(
            &format!("/api/v1/transactions/{entry}"),
            &admin,
            &json!({ "status": "failed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");

    // Customers cannot write the ledger directly
    let (_, status) = app
        .post_auth(
            "/api/v1/transactions",
            &token,
            &json!({ "account_id": account_id, "amount": "100" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let resp = app
        .client
        .delete(app.url(&format!("/api/v1/transactions/{entry}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    common::cleanup(app).await;
}

// ── Rate Plans & Subscriptions ──────────────────────────────────

#[tokio::test]
async fn rate_plans_crud_and_filters() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (customer, _) = app.customer("viewer@test.com").await;

    let basic = app.rate_plan(&admin, "Basic", "9.99").await;
    app.rate_plan(&admin, "Premium", "29.00").await;
    let id = basic["id"].as_str().unwrap();
    assert_eq!(basic["price"], "9.99");

    let (list, status) = app.get_auth("/api/v1/rate-plans", &customer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 2);

    let (list, _) = app
        .get_auth("/api/v1/rate-plans?search=prem", &customer)
        .await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["results"][0]["plan"], "Premium");

    let (_, status) = app
        .post_auth(
            "/api/v1/rate-plans",
            &customer,
            &json!({ "plan": "Hack", "price": "0" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (body, status) = app
        .post_auth(
            "/api/v1/rate-plans",
            &admin,
            &json!({ "plan": " ", "price": "-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["plan"].is_array());
    assert!(body["fields"]["price"].is_array());

    let (updated, status) = app
        .put_auth(
            &format!("/api/v1/rate-plans/{id}"),
            &admin,
            &json!({ "plan": "Basic+", "price": "12.00", "vm_limit": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["plan"], "Basic+");
    assert_eq!(updated["vm_limit"], 3);

    let (_, status) = app
        .delete_auth(&format!("/api/v1/rate-plans/{id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app
        .get_auth(&format!("/api/v1/rate-plans/{id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn subscriptions_are_scoped_and_admin_managed() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (alice, _) = app.customer("alice@test.com").await;
    let (bob, _) = app.customer("bob@test.com").await;
    app.deposit(&alice, json!(5)).await;

    let plan = app.rate_plan(&admin, "Basic", "5.00").await;
    let plan_id = plan["id"].as_str().unwrap();
    let (accounts, _) = app.get_auth("/api/v1/billing-accounts", &alice).await;
    let account_id = accounts["results"][0]["id"].as_str().unwrap();

    let (sub, status) = app
        .post_auth(
            "/api/v1/subscriptions",
            &admin,
            &json!({ "account_id": account_id, "plan_id": plan_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{sub}");
    assert_eq!(sub["status"], "active");
    let sub_id = sub["id"].as_str().unwrap();

    let (list, _) = app.get_auth("/api/v1/subscriptions", &alice).await;
    assert_eq!(list["total"], 1);
    let (list, _) = app.get_auth("/api/v1/subscriptions", &bob).await;
    assert_eq!(list["total"], 0);

    let (_, status) = app
        .get_auth(&format!("/api/v1/subscriptions/{sub_id}"), &bob)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Plans in use cannot be removed
    let (_, status) = app
        .delete_auth(&format!("/api/v1/rate-plans/{plan_id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, status) = app
        .post_auth(
            "/api/v1/subscriptions",
            &admin,
            &json!({ "account_id": account_id, "plan_id": uuid::Uuid::now_v7() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

// ── Guests ──────────────────────────────────────────────────────

#[tokio::test]
async fn guest_registration_requires_a_customer() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;

    let (body, status) = app
        .post_auth(
            "/api/v1/guest-registration",
            &admin,
            &json!({ "email": "guest@test.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Customer not found");
    assert_eq!(app.user_count().await, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn guest_registration_binds_to_calling_customer() {
    let app = common::spawn_app().await;
    app.bootstrap().await;
    let (token, _) = app.customer("owner@test.com").await;
    let (me, _) = app.get_auth("/api/v1/users/me", &token).await;
    let user_id: uuid::Uuid = me["id"].as_str().unwrap().parse().unwrap();
    let customer_id: uuid::Uuid = sqlx::query_scalar("SELECT id FROM customers WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let (body, status) = app
        .post_auth(
            "/api/v1/guest-registration",
            &token,
            &json!({ "email": "Guest@Test.com", "name": "G" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], "Guest created successfully");
    assert_eq!(body["guest"]["customer_id"], customer_id.to_string());
    assert_eq!(body["guest"]["email"], "guest@test.com");
    assert_eq!(body["guest"]["status"], "active");

    let (body, status) = app
        .post_auth(
            "/api/v1/guest-registration",
            &token,
            &json!({ "name": "No Email" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["email"][0], "This field is required.");

    let (_, status) = app
        .post_auth(
            "/api/v1/guest-registration",
            &token,
            &json!({ "email": "guest@test.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    common::cleanup(app).await;
}

#[tokio::test]
async fn guest_listing_and_statistics_are_scoped() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (alice, _) = app.customer("alice@test.com").await;
    let (bob, _) = app.customer("bob@test.com").await;

    app.guest(&alice, "a1@test.com", "active").await;
    app.guest(&alice, "a2@test.com", "inactive").await;
    let bob_guest = app.guest(&bob, "b1@test.com", "active").await;
    let bob_guest_id = bob_guest["id"].as_str().unwrap();

    let (list, _) = app.get_auth("/api/v1/guests", &alice).await;
    assert_eq!(list["total"], 2);
    let (stats, _) = app.get_auth("/api/v1/guests/statistics", &alice).await;
    assert_eq!(stats, json!({ "total": 2, "active": 1, "inactive": 1 }));

    let (stats, _) = app.get_auth("/api/v1/guests/statistics", &admin).await;
    assert_eq!(stats, json!({ "total": 3, "active": 2, "inactive": 1 }));

    let (list, _) = app
        .get_auth("/api/v1/guests?customer_email=bob@test.com", &admin)
        .await;
    assert_eq!(list["total"], 1);

    // Another customer's guest is invisible, not forbidden
    let (_, status) = app
        .get_auth(&format!("/api/v1/guests/{bob_guest_id}"), &alice)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status) = app
        .delete_auth(&format!("/api/v1/guests/{bob_guest_id}"), &alice)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (updated, status) = app
        .put_auth(
            &format!("/api/v1/guests/{bob_guest_id}"),
            &bob,
            &json!({ "status": "inactive" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "inactive");

    // A guest has no customer record to scope by
    let guest_login = app
        .post_auth(
            "/api/v1/guests",
            &admin,
            &json!({
                "email": "g-login@test.com",
                "password": common::PASSWORD,
                "customer_id": updated["customer_id"],
            }),
        )
        .await;
    assert_eq!(guest_login.1, StatusCode::OK, "{}", guest_login.0);
    let (login, _) = app.login("g-login@test.com", common::PASSWORD).await;
    let guest_token = login["access_token"].as_str().unwrap();
    let (_, status) = app.get_auth("/api/v1/guests", guest_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

// ── Customers ───────────────────────────────────────────────────

#[tokio::test]
async fn suspend_is_idempotent_and_validated() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;

    let (customer, status) = app
        .post_auth(
            "/api/v1/customers",
            &admin,
            &json!({ "email": "sus@test.com", "name": "Sus" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{customer}");
    let id = customer["id"].as_str().unwrap();
    let path = format!("/api/v1/customers/{id}/suspend");

    for _ in 0..2 {
        let (body, status) = app.post_auth(&path, &admin, &json!({ "suspend": true })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], "Customer account suspended successfully");
    }
    let (got, _) = app
        .get_auth(&format!("/api/v1/customers/{id}"), &admin)
        .await;
    assert_eq!(got["suspended"], true);

    let (body, status) = app.post_auth(&path, &admin, &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["suspend"].is_array());

    let (_, status) = app
        .post_auth(&path, &admin, &json!({ "suspend": "maybe" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = uuid::Uuid::now_v7();
    let (_, status) = app
        .post_auth(
            &format!("/api/v1/customers/{missing}/suspend"),
            &admin,
            &json!({ "suspend": true }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn directory_updates_roll_back_as_a_whole() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;

    let (customer, status) = app
        .post_auth(
            "/api/v1/customers",
            &admin,
            &json!({ "email": "whole@test.com", "name": "Before" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{customer}");
    let customer_id = customer["id"].as_str().unwrap();

    let (guest, status) = app
        .post_auth(
            "/api/v1/guests",
            &admin,
            &json!({ "email": "whole-guest@test.com", "name": "Before", "customer_id": customer_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{guest}");
    let guest_id = guest["id"].as_str().unwrap();

    sqlx::raw_sql(
        "CREATE FUNCTION reject_role_update() RETURNS trigger AS $$
         BEGIN RAISE EXCEPTION 'role tables locked'; END;
         $$ LANGUAGE plpgsql;
         CREATE TRIGGER reject_customer_update BEFORE UPDATE ON customers
         FOR EACH ROW EXECUTE FUNCTION reject_role_update();
         CREATE TRIGGER reject_guest_update BEFORE UPDATE ON guests
         FOR EACH ROW EXECUTE FUNCTION reject_role_update();",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let (_, status) = app
        .put_auth(
            &format!("/api/v1/customers/{customer_id}"),
            &admin,
            &json!({ "name": "After", "suspended": true }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (got, _) = app
        .get_auth(&format!("/api/v1/customers/{customer_id}"), &admin)
        .await;
    assert_eq!(got["name"], "Before");
    assert_eq!(got["suspended"], false);

    let (_, status) = app
        .put_auth(
            &format!("/api/v1/guests/{guest_id}"),
            &admin,
            &json!({ "name": "After", "status": "inactive" }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (got, _) = app
        .get_auth(&format!("/api/v1/guests/{guest_id}"), &admin)
        .await;
    assert_eq!(got["name"], "Before");
    assert_eq!(got["status"], "active");

    common::cleanup(app).await;
}

#[tokio::test]
async fn customer_statistics_count_all_guests() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (alice, _) = app.customer("alice@test.com").await;
    let (_bob, _) = app.customer("bob@test.com").await;
    app.guest(&alice, "g1@test.com", "active").await;
    app.guest(&alice, "g2@test.com", "active").await;

    let (list, _) = app.get_auth("/api/v1/customers?search=bob", &admin).await;
    let bob_id = list["results"][0]["id"].as_str().unwrap();
    app.post_auth(
        &format!("/api/v1/customers/{bob_id}/suspend"),
        &admin,
        &json!({ "suspend": true }),
    )
    .await;

    let (stats, status) = app.get_auth("/api/v1/customers/statistics", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({ "total": 2, "active": 1, "inactive": 1, "guests": 2 })
    );

    let (list, _) = app
        .get_auth("/api/v1/customers?suspended=true", &admin)
        .await;
    assert_eq!(list["total"], 1);

    let (_, status) = app.get_auth("/api/v1/customers/statistics", &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_only_directory_endpoints() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (customer, _) = app.customer("plain@test.com").await;

    for path in ["/api/v1/admins", "/api/v1/customers", "/api/v1/audit-events"] {
        let (body, status) = app.get_auth(path, &customer).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
        assert_eq!(body["error"], "Admin access required");
    }

    let (created, status) = app
        .post_auth(
            "/api/v1/admins",
            &admin,
            &json!({ "email": "second-admin@test.com", "name": "Two", "password": common::PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{created}");
    let (list, _) = app.get_auth("/api/v1/admins?search=second", &admin).await;
    assert_eq!(list["total"], 1);

    let (login, status) = app.login("second-admin@test.com", common::PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["role"], "admin");

    let id = created["id"].as_str().unwrap();
    let (_, status) = app.delete_auth(&format!("/api/v1/admins/{id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app.login("second-admin@test.com", common::PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (events, status) = app.get_auth("/api/v1/audit-events", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert!(events["total"].as_i64().unwrap() > 0);

    common::cleanup(app).await;
}

// ── Users ───────────────────────────────────────────────────────

#[tokio::test]
async fn users_only_see_themselves() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (token, user_id) = app.customer("self@test.com").await;

    let (me, status) = app.get_auth("/api/v1/users/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "self@test.com");
    assert_eq!(me["role"], "customer");

    let (list, _) = app.get_auth("/api/v1/users", &token).await;
    assert_eq!(list["total"], 1);
    let (list, _) = app.get_auth("/api/v1/users", &admin).await;
    assert_eq!(list["total"], 1);

    let (admin_me, _) = app.get_auth("/api/v1/users/me", &admin).await;
    let admin_id = admin_me["id"].as_str().unwrap();
    let (_, status) = app
        .get_auth(&format!("/api/v1/users/{admin_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (updated, status) = app
        .put_auth(
            &format!("/api/v1/users/{user_id}"),
            &token,
            &json!({ "name": "Renamed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["email"], "self@test.com");

    common::cleanup(app).await;
}

// ── Social Login ────────────────────────────────────────────────

#[tokio::test]
async fn social_login_creates_then_reuses_user() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app
        .post("/api/v1/social-login/google", &json!({ "token": "google-ok" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["email"], "social@example.com");
    assert_eq!(body["user"]["name"], "Social User");
    assert_eq!(body["user"]["role"], "customer");
    assert_eq!(body["user"]["is_active"], true);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    let first_id = body["user"]["id"].clone();

    // A federated user has no password to log in with
    let (_, status) = app.login("social@example.com", "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (body, status) = app
        .post("/api/v1/social-login/google", &json!({ "token": "google-renamed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], first_id);
    assert_eq!(body["user"]["name"], "Social User");
    assert_eq!(app.user_count().await, 2);

    // The new customer can immediately register guests
    let token = body["access_token"].as_str().unwrap();
    let (_, status) = app
        .post_auth(
            "/api/v1/guest-registration",
            token,
            &json!({ "email": "social-guest@test.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

#[tokio::test]
async fn social_login_input_errors() {
    let app = common::spawn_app().await;

    let (body, status) = app.post("/api/v1/social-login/google", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Token is required.");

    let (body, status) = app
        .post("/api/v1/social-login/google", &json!({ "token": "google-no-email" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is required.");
    assert_eq!(app.user_count().await, 0);

    let (body, status) = app
        .post("/api/v1/social-login/google", &json!({ "token": "google-bad-email" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email address");

    let (body, status) = app
        .post("/api/v1/social-login/google", &json!({ "token": "expired" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Google API request failed: Invalid Credentials"
    );

    let (_, status) = app
        .post("/api/v1/social-login/google", &json!({ "token": "google-timeout" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.user_count().await, 0);

    common::cleanup(app).await;
}
