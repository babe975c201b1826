pub mod allocation;
pub mod recommendation;
