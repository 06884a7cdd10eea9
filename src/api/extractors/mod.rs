//! Custom extractors.

mod subject;
mod validated_json;

pub use subject::Subject;
pub use validated_json::ValidatedJson;
