pub mod attrs;
pub mod canonical;
pub mod compile;
pub mod filter;
pub mod fingerprint;
pub mod merge;
pub mod plan;
pub mod query;
pub mod terms;
pub mod topic;
pub mod unit;

pub use query::QueryError;
