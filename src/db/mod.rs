pub mod audit;
pub mod billing_accounts;
pub mod customers;
pub mod general_admins;
pub mod guests;
pub mod query;
pub mod rate_plans;
pub mod refresh_tokens;
pub mod subscriptions;
pub mod transactions;
pub mod users;
