mod candidate;
mod movie;
mod profile;

pub use candidate::{Candidate, SearchHit, SearchResult};
pub use movie::{round_to, DocumentMetadata, EmbeddingDocument, MovieRecord};
pub use profile::{PreferenceProfile, ProfileParse, FALLBACK_QUERY};
