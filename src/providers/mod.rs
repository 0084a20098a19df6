pub mod client;
pub mod logo;
pub mod news;
pub mod quote;

pub use client::ProviderClient;
pub use logo::{DEFAULT_LOGO, LogoResolver};
pub use news::{NewsItem, parse_news};
pub use quote::parse_price;
