//! Route paths.

pub const POST_AUTH_REGISTER: &str = "/api/auth/register";
pub const POST_AUTH_LOGIN: &str = "/api/auth/login";
pub const POST_AUTH_REFRESH: &str = "/api/auth/refresh-token";
pub const GET_AUTH_ME: &str = "/api/auth/me";
