// Application layer: services, gateway, CQRS buses and handlers

pub mod command_bus;
pub mod command_handlers;
pub mod commands;
pub mod gateway;
pub mod queries;
pub mod query_bus;
pub mod query_handlers;
pub mod services;
