pub mod adjustment;
pub mod export;
pub mod punch;
pub mod report;
