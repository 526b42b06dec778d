pub mod admins;
pub mod audit;
pub mod auth;
pub mod billing_accounts;
pub mod customers;
pub mod guests;
pub mod rate_plans;
pub mod social;
pub mod subscriptions;
pub mod transactions;
pub mod users;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/change-password", post(auth::change_password))
        .route("/api/v1/social-login/google", post(social::google))
        // Billing
        .route(
            "/api/v1/rate-plans",
            get(rate_plans::list).post(rate_plans::create),
        )
        .route(
            "/api/v1/rate-plans/{id}",
            get(rate_plans::get)
                .put(rate_plans::update)
                .delete(rate_plans::delete),
        )
        .route(
            "/api/v1/subscriptions",
            get(subscriptions::list).post(subscriptions::create),
        )
        .route(
            "/api/v1/subscriptions/{id}",
            get(subscriptions::get)
                .put(subscriptions::update)
                .delete(subscriptions::delete),
        )
        .route(
            "/api/v1/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/api/v1/transactions/{id}",
            get(transactions::get).put(transactions::update),
        )
        .route(
            "/api/v1/billing-accounts",
            get(billing_accounts::list).post(billing_accounts::create),
        )
        .route(
            "/api/v1/billing-accounts/deposit",
            post(billing_accounts::deposit),
        )
        .route(
            "/api/v1/billing-accounts/balance",
            get(billing_accounts::balance),
        )
        .route("/api/v1/billing-accounts/{id}", get(billing_accounts::get))
        // Users
        .route("/api/v1/users", get(users::list))
        .route("/api/v1/users/me", get(users::me))
        .route("/api/v1/users/{id}", get(users::get).put(users::update))
        .route("/api/v1/admins", get(admins::list).post(admins::create))
        .route(
            "/api/v1/admins/{id}",
            get(admins::get).put(admins::update).delete(admins::delete),
        )
        .route(
            "/api/v1/customers",
            get(customers::list).post(customers::create),
        )
        .route("/api/v1/customers/statistics", get(customers::statistics))
        .route(
            "/api/v1/customers/{id}",
            get(customers::get)
                .put(customers::update)
                .delete(customers::delete),
        )
        .route("/api/v1/customers/{id}/suspend", post(customers::suspend))
        .route("/api/v1/guests", get(guests::list).post(guests::create))
        .route("/api/v1/guests/statistics", get(guests::statistics))
        .route(
            "/api/v1/guests/{id}",
            get(guests::get).put(guests::update).delete(guests::delete),
        )
        .route("/api/v1/guest-registration", post(guests::register))
        // Audit
        .route("/api/v1/audit-events", get(audit::list))
}
