pub mod errors;
pub mod extract;
pub mod jwt;
pub mod validation;
