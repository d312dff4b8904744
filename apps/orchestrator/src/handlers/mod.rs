//! HTTP adapters (spec §6.1, §6.2). The core itself is transport-agnostic;
//! these handlers are the thin façade that maps JSON bodies onto the
//! service layer and the status codes of spec §6.1/§7 onto responses.

pub mod api_keys;
pub mod brands;
pub mod health;
pub mod node_agent;
pub mod resources;
pub mod tenants;
pub mod topology;
