pub mod attendance;
pub mod leave;
pub mod office;
pub mod qr_token;
pub mod role;
