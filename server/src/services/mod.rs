pub mod counter_animator;
pub mod roster_poller;
