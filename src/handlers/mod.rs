// src/handlers/mod.rs

pub mod photo;
pub mod question;
pub mod response;
pub mod room;
pub mod seed;
pub mod storage;
