pub mod bithumb;
pub mod indicator;
pub mod model;
pub mod notification;
pub mod rank;
pub mod strategy;
pub mod task;
pub mod traits;
