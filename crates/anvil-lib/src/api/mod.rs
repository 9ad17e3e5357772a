//! Clients for external web APIs.

pub mod modrinth;
