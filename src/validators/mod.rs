mod payload;
mod token;

pub use payload::{PayloadValidator, ValidationMode, DEFAULT_REQUIRED_CLAIMS};
pub use token::TokenValidator;
