//! Request extractors.

mod validated_query;

pub use validated_query::ValidatedQuery;
