//! Tick-based simulation of small wheeled robots on a rectangular field.


pub mod arena;
pub mod config;
pub mod controller;
pub mod domain;
pub mod resource;
pub mod simulator;
pub mod telemetry;
