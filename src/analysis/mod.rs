//! Feature generation and aggregation.
//!
//! - per-row derived fields (`features`)
//! - grouped reductions and rolling means (`aggregate`)
//! - top-N selections and display tables (`rank`)

pub mod aggregate;
pub mod features;
pub mod rank;

pub use aggregate::{
    Agg, AggregateError, AggregateTable, Column, GroupedMetrics, aggregate, count_by, count_share,
    moving_averages, rolling_mean,
};
pub use features::generate_features;
pub use rank::{
    ClassSeries, DisplayTable, Distribution, TopRankings, labelled_table, top_classes_by_count,
    top_cost_distribution,
};
