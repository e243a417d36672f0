pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod likee;
pub mod media;
pub mod models;
pub mod platforms;
pub mod service;
pub mod youtube;
pub mod ytdlp;
