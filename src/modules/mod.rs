pub mod auth;
pub mod category;
pub mod dish;
pub mod notification;
pub mod order;
pub mod payment;
pub mod restaurant;
pub mod user;

mod router;
pub use router::get_router;
