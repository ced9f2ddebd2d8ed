pub mod config;
pub mod constants;
pub mod engine;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod items;
pub mod player;
pub mod population;
pub mod rng;
pub mod store;
pub mod types;
pub mod world;
