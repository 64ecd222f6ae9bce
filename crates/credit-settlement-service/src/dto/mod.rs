//! 请求/响应 DTO

mod request;
mod response;

pub use request::{AttendanceRequest, CheckoutRequest, CreateBookingRequest};
pub use response::{
    ApiResponse, BalanceResponse, CancellationOutcome, CheckoutResponse, WebhookAck,
};
