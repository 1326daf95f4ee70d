//! Bearer-token session lifecycle and role-scoped menu authorization for an admin
//! back office.

pub mod app;
pub mod config;
pub mod dto;
pub mod entity;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod repository;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
