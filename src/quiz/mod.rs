//! Question records, parsing, validation and generation.

pub mod generator;
pub mod parse;
pub mod prompt;
pub mod record;
pub mod validator;

pub use generator::Generator;
pub use record::{Candidate, QuestionRecord, RejectedRecord, OPTION_COUNT};
pub use validator::{is_valid, ValidationPolicy, Validator};
