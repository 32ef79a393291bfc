pub mod fixture;
pub mod user;
