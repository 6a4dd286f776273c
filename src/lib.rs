//! # Card Balance Core
//!
//! A library for tracking credit cards and their daily balance history.
//!
//! ## Features
//!
//! - **Balance timelines**: Per-card day index with exact, nearest-forward and as-of lookups
//! - **Reconciliation**: Merge out-of-order, overlapping balance batches into a card's history
//! - **Partial failure**: Multi-card submissions report each failing card without blocking others
//! - **Card registry**: Users, cards and ownership lookup with cascade deletion
//! - **Storage abstraction**: Database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use card_balance_core::{BalanceTracker, BalanceUpdate, FixedClock};
//! use card_balance_core::utils::MemoryStorage;
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! let today = NaiveDate::from_ymd_opt(2023, 4, 13).unwrap();
//! let tracker = BalanceTracker::with_clock(MemoryStorage::new(), Arc::new(FixedClock(today)));
//! let update = BalanceUpdate::new(
//!     "4111111111111111".to_string(),
//!     NaiveDate::from_ymd_opt(2023, 4, 10).unwrap(),
//!     BigDecimal::from(800),
//! );
//! // tracker.update_balances(&[update]).await;
//! # let _ = (tracker, update);
//! ```

pub mod cards;
pub mod config;
pub mod reconciliation;
pub mod timeline;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use cards::*;
pub use config::TrackerConfig;
pub use reconciliation::*;
pub use timeline::*;
pub use traits::*;
pub use types::*;
