pub mod handlers;

pub use handlers::{CountdownHandler, CountdownJob, DropFlagHandler, SlowHandler};
