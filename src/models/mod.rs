// src/models/mod.rs

pub mod photo;
pub mod question;
pub mod response;
pub mod room;
