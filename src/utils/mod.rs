pub mod multipart;
pub mod pagination;
pub mod response;
