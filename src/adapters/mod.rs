pub mod controllers;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod repositories;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
