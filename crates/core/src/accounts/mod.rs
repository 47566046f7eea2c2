//! Chart of accounts.
//!
//! - Account types and their normal balance side
//! - The canonical chart seeded at start-up
//! - Hierarchical views
//! - The registry service

pub mod chart;
pub mod registry;
pub mod tree;
pub mod types;

pub use chart::{CANONICAL_CHART, ChartAccount};
pub use registry::AccountRegistry;
pub use tree::{AccountGroup, AccountNode, AccountTree};
pub use types::{Account, AccountType, NormalBalance, SeedSummary};
