//! Roomcast - room-scoped broadcast backplane
//!
//! Lets independently running server processes deliver a message to every
//! client in a room, whichever process holds the client's connection.
//! Rooms are served by an [`Adapter`](ports::Adapter) produced by an
//! [`AdapterFactory`](adapters::AdapterFactory), backed either by in-process
//! delivery or by Redis pub/sub (standalone or Sentinel).

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
