mod client;
mod store_url;

pub use client::*;
pub use store_url::*;
