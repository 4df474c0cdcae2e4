pub mod export;
pub mod recommendation;
pub mod training;
