//! Stats module - grouped descriptive statistics

mod calculator;

pub use calculator::{AggregateRecord, GroupKey, StatsCalculator, Summary};
