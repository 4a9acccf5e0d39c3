pub mod core;
pub mod groups;
pub mod modal;
pub mod reports;
pub mod sync;
pub mod view;
