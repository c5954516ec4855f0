mod client_ip;
mod json_body;
mod rate_limit;

pub use client_ip::ClientIp;
pub use json_body::JsonBody;
pub use rate_limit::api_rate_limit;
