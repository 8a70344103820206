pub mod bus;
pub mod clock;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod refresh;
pub mod repo;
pub mod seed;
