//! Operations that span more than one node.
//!
//! Each workflow runs its steps in order and every step persists on its
//! own. A step failing after an earlier one succeeded leaves the earlier
//! effects in place; nothing is rolled back. Checks that can be made
//! before the first mutation are made there.

pub mod assembly;
pub mod bidding;
pub mod logistics;
pub mod market;

pub use logistics::Shipment;
pub use market::Sale;
