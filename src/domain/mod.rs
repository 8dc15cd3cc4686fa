// Domain layer: records and the ports the sync core talks through.

pub mod model;
pub mod ports;
