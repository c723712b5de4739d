pub mod deps;
pub mod pack;
