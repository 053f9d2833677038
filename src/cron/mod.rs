pub mod jobs;
mod scheduler;
mod single_flight;

pub use scheduler::CronScheduler;
pub use single_flight::{FlightGuard, SingleFlight};
