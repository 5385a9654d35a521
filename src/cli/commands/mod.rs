//! One module per subcommand, each exposing `execute`.

pub mod audit_cmd;
pub mod auth;
pub mod decrypt;
pub mod encrypt;
pub mod export;
pub mod init;
pub mod register;
pub mod remove_user;
pub mod rotate;
pub mod status;
pub mod users;
