use std::env;
use dotenvy::dotenv;
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_punch_per_min: u32,
    pub rate_adjustment_per_min: u32,
    pub rate_report_per_min: u32,
    pub rate_export_per_min: u32,

    pub api_prefix: String,

    // Startup warmups
    pub warmup_filter_batch: usize,
    pub warmup_cache_days: u32,
    pub warmup_cache_batch: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            rate_punch_per_min: env::var("RATE_PUNCH_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_adjustment_per_min: env::var("RATE_ADJUSTMENT_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_report_per_min: env::var("RATE_REPORT_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_export_per_min: env::var("RATE_EXPORT_PER_MIN")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            warmup_filter_batch: env::var("WARMUP_FILTER_BATCH")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap(),
            warmup_cache_days: env::var("WARMUP_CACHE_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            warmup_cache_batch: env::var("WARMUP_CACHE_BATCH")
                .unwrap_or_else(|_| "250".to_string())
                .parse()
                .unwrap(),
        }
    }
}
