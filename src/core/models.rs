pub mod answer;
pub mod common;
pub mod form;
pub mod question;
pub mod submission;
pub mod upload_file;
