//! Search domain - retrieval over scraped content plus a short generated answer.

pub mod actions;
pub mod answer;
pub mod matcher;

pub use actions::{preview, search, SearchAnswer, SearchError};
pub use answer::AnswerGenerator;
pub use matcher::{find_best_match, FlatL2Index, MatchError};
