pub mod events;
pub mod repository;
pub mod routes;
pub mod service;
