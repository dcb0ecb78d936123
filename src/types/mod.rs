pub mod location;
pub mod region;
pub mod station;
pub mod timeseries;
