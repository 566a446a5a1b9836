//! Account Bounded Context
//!
//! Balances and margins per account. Accounts change only by applying
//! `AccountState` events reported by venues; they are never inferred from
//! orders.

mod aggregate;
mod events;
mod value_objects;

pub use aggregate::Account;
pub use events::AccountState;
pub use value_objects::{AccountBalance, AccountType, MarginBalance};
