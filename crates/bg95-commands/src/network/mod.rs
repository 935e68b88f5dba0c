//! Network bring-up commands: SIM, signal, operator and PDP context.

pub mod cgact;
pub mod cgdcont;
pub mod cops;
pub mod cpin;
pub mod csq;
