pub mod health;
pub mod yield_routes;
