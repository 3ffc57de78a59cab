//! KG Chat core library — backend API client, session identity, message
//! timeline, and presentation helpers used by both the CLI and desktop
//! applications.

pub mod api;
pub mod chat;
pub mod config;
pub mod format;
pub mod init;
pub mod session;
pub mod timeline;
