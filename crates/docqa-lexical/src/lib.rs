//! docqa-lexical
//!
//! Brute-force keyword matcher over the stored chunks. Scores are additive
//! integers: keyword occurrences, bracketed-title bonuses and a table of
//! intent bonuses for canonical tables. See `settings` for the knobs.
pub mod search;
pub mod settings;

pub use search::LexicalIndex;
pub use settings::{ContentSignature, IntentBonus, LexicalSettings};
