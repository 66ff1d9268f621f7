// handlers/public/auth/mod.rs - token acquisition

pub mod login;

pub use login::login_post;
