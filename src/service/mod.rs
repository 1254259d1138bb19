pub mod assistant;
pub mod bia_analysis;
pub mod compliance;
pub mod dashboard;
pub mod prompts;
pub mod risk_register;
pub mod risk_scoring;
