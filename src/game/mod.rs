pub mod action;
pub mod battle;
pub mod chain;
pub mod event;
pub mod field;
pub mod outcome;
pub mod phase;
pub mod session;
pub mod snapshot;
pub mod summon;
pub mod turn;
