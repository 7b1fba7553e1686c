pub mod area_of_interest;
pub mod canonical_frame;
pub mod gridded;
pub mod payload;
pub mod query_spec;
pub mod tabular;
pub mod variables;
