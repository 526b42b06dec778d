pub mod accounts;
pub mod directory;
pub mod federation;
pub mod guests;
