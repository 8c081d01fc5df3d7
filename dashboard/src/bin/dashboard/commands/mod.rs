pub mod check;
pub mod resources;
pub mod serve;
