pub mod cards;
pub mod health;
pub mod query;
pub mod search;
