// Domain layer: models, ports and the deterministic analysis services.

pub mod model;
pub mod ports;

pub mod services;
