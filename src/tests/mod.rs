//! tests/mod.rs
//! Pruebas del monitor (corridas de check, almacenamiento, clientes HTTP, API).

mod http_client_tests;
mod support;
