pub mod extractor;
pub mod jwt;
pub mod password;
pub mod scope;
pub mod session;
