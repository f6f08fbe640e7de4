// Cross-cutting layers applied to the whole router

pub mod cors;

pub use cors::cors_layer;
