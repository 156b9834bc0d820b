//! API layer
//!
//! JSON endpoints over the account store.

mod users;

pub use users::users_router;
