// Domain layer: core models and ports (interfaces) to the catalog, order placement,
// text generation and menu search collaborators.

pub mod model;
pub mod ports;
