pub mod render;
pub mod research;
