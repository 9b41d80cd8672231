pub mod dispatch;

pub use dispatch::register_routes;
