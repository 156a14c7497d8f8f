pub mod account_cache;
pub mod account_filter;
pub mod validate;
