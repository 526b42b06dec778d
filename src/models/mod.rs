mod audit_event;
mod billing_account;
mod customer;
mod general_admin;
mod guest;
mod rate_plan;
mod refresh_token;
mod subscription;
mod transaction;
mod user;

pub use audit_event::AuditEvent;
pub use billing_account::BillingAccount;
pub use customer::Customer;
pub use general_admin::GeneralAdmin;
pub use guest::{Guest, GuestStatus};
pub use rate_plan::RatePlan;
pub use refresh_token::RefreshToken;
pub use subscription::{Subscription, SubscriptionStatus};
pub use transaction::{Transaction, TransactionStatus};
pub use user::{Role, User};
