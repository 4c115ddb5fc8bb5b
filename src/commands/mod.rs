pub mod cases;
pub mod render;
pub mod run;
