pub mod access;
pub mod actor;
pub mod assessment;
pub mod attempt;
pub mod course;
pub mod enrollment;
pub mod ids;
pub mod payment;
pub mod ports;
