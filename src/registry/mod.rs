pub mod rescuers;
pub mod tickets;
