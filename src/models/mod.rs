pub mod batch;
pub mod courier;
pub mod event;
pub mod hours;
pub mod order;
