//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod check_model;
pub mod template_model;
pub mod update_model;
