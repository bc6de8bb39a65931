pub mod health;
pub mod monitors;
