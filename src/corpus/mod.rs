//! Offline corpus build: raw CSV sources in, master dataset and embedding
//! corpus out.

pub mod artifacts;
pub mod builder;
pub mod literal;
pub mod parse;
pub mod sources;
pub mod stats;
pub mod validate;

pub use builder::{build_corpus, join_sources, CorpusBuild};
pub use stats::{weighted_rating, RatingPrior, RatingStats};
pub use validate::{validate_dataset, ValidationReport};

pub const MOVIES_FILE: &str = "movies_metadata.csv";
pub const RATINGS_FILE: &str = "ratings_small.csv";
pub const CREDITS_FILE: &str = "credits.csv";
pub const KEYWORDS_FILE: &str = "keywords.csv";

pub const MASTER_FILE: &str = "movies_master.csv";
pub const CORPUS_FILE: &str = "embeddings_corpus.jsonl";
