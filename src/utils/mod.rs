pub mod fingerprint_filter;
pub mod punch_cache;
