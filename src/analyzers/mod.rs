pub mod correlation;

pub use correlation::{CorrelationAnalyzer, CorrelationMatrix};
