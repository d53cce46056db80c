pub mod chart;

pub use chart::ChartService;
