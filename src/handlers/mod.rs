pub mod assessments;
pub mod bia;
pub mod dashboard;
pub mod frameworks;
pub mod health;
pub mod organizations;
pub mod policies;
pub mod risks;
pub mod runbooks;
