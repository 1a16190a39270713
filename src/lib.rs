//! Blogicum - a small multi-author blog
//!
//! This library provides the pages, storage and services of the Blogicum site.

pub mod api;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod theme;
