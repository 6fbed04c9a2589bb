pub mod client;
pub mod types;

pub use client::{Mt5Client, Mt5ClientError};
pub use types::{ClientProfile, RawTradeItem};
