//! Users, credit cards and the tracker facade

pub mod card;
pub mod core;
pub mod user;

pub use card::*;
pub use self::core::*;
pub use user::*;
