// Domain layer: engine, entities, value objects

pub mod abac;
pub mod error;
pub mod group;
pub mod policy;
pub mod principal;
pub mod resource;
pub mod role;
pub mod tenant;
pub mod unit;
pub mod user;
