pub mod email;
pub mod loader;
pub mod pdf;
pub mod xlsx;
