pub mod capture;
pub mod emitter;
pub mod event;
pub mod identity;
pub mod lifecycle;
pub mod observer;
pub mod reactor;
pub mod route;
pub mod scheduler;
pub mod state;
pub mod telemetry;
pub mod time;
pub mod transport;
