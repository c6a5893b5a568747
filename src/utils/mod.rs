// src/utils/mod.rs

pub mod photo;
