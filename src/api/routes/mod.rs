pub mod alerts;
pub mod assets;
pub mod health;
pub mod stats;
