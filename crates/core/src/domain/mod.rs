pub mod challenge;
pub mod reviewer;
