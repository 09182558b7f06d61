pub mod achievements;
pub mod chrome;
pub mod nav;
