pub mod aggregator;
pub mod cache;
pub mod group_key;

pub use aggregator::{CommissionReport, DownlineReport, TimeWindow};
pub use cache::AnalyticsCache;
pub use group_key::{derive_keys, is_demo_group, RuleMap, RuleTerms};
