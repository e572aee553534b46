//! SeaORM entities for the agent runtime tables.

pub mod agent;
pub mod events;
pub mod optimization;
