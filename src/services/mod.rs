pub mod account_store;
pub mod answer_synthesizer;
pub mod submission_builder;

pub use account_store::{format_ra, is_valid_ra, AccountStore, SavedAccount};
pub use answer_synthesizer::synthesize_answer;
pub use submission_builder::{build_payload, format_timestamp};
