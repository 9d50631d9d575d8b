pub mod doord;
pub mod health;
pub mod udm;
