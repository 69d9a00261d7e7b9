pub mod validate_token;

pub use validate_token::TokenValidator;
