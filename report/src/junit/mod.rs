pub mod filter;
pub mod normalize;
pub mod report;
pub mod xml;
