//! Service layer
//!
//! Business logic between the HTTP handlers and the data layer:
//! - Account provisioning on login
//! - Account reads

mod account;
mod provisioning;

pub use account::AccountService;
pub use provisioning::ProvisioningService;
