//! WebSocket connection management, lifecycle, event dispatch, and fan-out.

pub mod connection;
pub mod dispatch;
pub mod hub;
pub mod session;
