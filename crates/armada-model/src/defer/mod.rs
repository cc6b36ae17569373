mod token;
pub use token::ResumptionToken;

mod trigger;
pub use trigger::{Trigger, TriggerConfig, WakeReason};
