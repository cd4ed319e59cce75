pub mod summary;
pub mod ticket;
