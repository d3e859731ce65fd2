pub mod archive;
pub mod assistant;
pub mod auth;
pub mod balance;
pub mod config;
pub mod error;
pub mod exchange;
pub mod export;
pub mod form;
pub mod ledger;
pub mod routes;
pub mod sample;
pub mod schemas;
pub mod state;
pub mod summary;
pub mod taxonomy;
