pub mod media_service;
pub mod otp_service;
pub mod rate_limit;
pub mod slug;
pub mod token_service;
