pub mod calculator;
pub mod error;
pub mod http;
pub mod resolver;

pub use calculator::{offline_calculator, OfflineCalculator};
pub use error::SourceError;
pub use http::{Endpoints, HtmlSource, HttpSources, TimingApi};
pub use resolver::{ResolverConfig, SourceResolver};
