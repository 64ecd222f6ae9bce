//! HTTP 处理器

pub mod activity;
pub mod booking;
pub mod credit;
pub mod health;
pub mod payment;
