pub mod add;
pub mod image;
pub mod init;
pub mod items;
pub mod status;
