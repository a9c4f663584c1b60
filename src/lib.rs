pub mod aggregate;
pub mod config;
pub mod error;
pub mod flags;
pub mod kpi;
pub mod models;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod sequence;
pub mod synthetic;
pub mod table;
