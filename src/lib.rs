// Configuration (TOML file + environment secrets)
pub mod config;

// Identity records and token storage
pub mod identity;

// Browser session registry
pub mod session;

// Music provider integration (OAuth + Web API)
pub mod provider;

// HTTP surface
pub mod api;
