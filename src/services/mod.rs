pub mod providers;
pub mod query;
pub mod recommendations;
pub mod retrieval;
