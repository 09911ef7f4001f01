pub mod card;
pub mod chain;
pub mod init;
pub mod milestone;
pub mod project;
