pub mod batch;
pub mod init;
pub mod mark;
pub mod validate;
