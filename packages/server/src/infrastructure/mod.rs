//! Infrastructure layer: broadcast fabric, persistence, DTOs.

pub mod broadcast;
pub mod dto;
pub mod repository;
