pub mod identity;

pub use identity::{IdentityTracker, DEFAULT_MATCH_DISTANCE};
