pub mod currencyfreaks;
pub mod util;
pub mod watchlist_api;

pub use currencyfreaks::CurrencyFreaksProvider;
pub use watchlist_api::WatchlistApi;
