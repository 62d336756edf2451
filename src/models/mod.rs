pub mod dispatch;
pub mod rescuer;
pub mod ticket;
