pub mod catalog;
pub mod demo;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod registry;
pub mod session;
pub mod store;
pub mod workflow;
