//! services/response_parser.rs
//! Parser del XML que devuelve el registro de plantillas.
//!
//! El namespace del documento no es fijo: se toma del elemento raíz y con él
//! se califican todas las búsquedas (`VERSION`, `DESCRIPTION_UPDATE`).

use quick_xml::{
    events::Event,
    name::{Namespace, ResolveResult},
    reader::NsReader,
};
use regex::Regex;
use std::{fmt::Display, sync::OnceLock};

use crate::models::update_model::UpdateCandidate;

pub const VERSION_ELEMENT: &str = "VERSION";
pub const DESCRIPTION_ELEMENT: &str = "DESCRIPTION_UPDATE";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("XML mal formado: {0}")]
    Malformed(String),

    /// El documento es válido pero no trae el dato (o viene vacío)
    #[error("falta el elemento {0} en la respuesta")]
    MissingField(&'static str),
}

/// Resultado de recorrer el documento una vez: namespace de la raíz y el
/// texto del primer `VERSION` / `DESCRIPTION_UPDATE` bajo ese namespace.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScannedDocument {
    /// `None` = raíz sin namespace
    pub root_namespace: Option<Vec<u8>>,
    pub version: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Version,
    Description,
}

impl Field {
    fn from_local(local: &[u8]) -> Option<Field> {
        if local == VERSION_ELEMENT.as_bytes() {
            Some(Field::Version)
        } else if local == DESCRIPTION_ELEMENT.as_bytes() {
            Some(Field::Description)
        } else {
            None
        }
    }
}

impl ScannedDocument {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Version => &mut self.version,
            Field::Description => &mut self.description,
        }
    }

    /// Solo se guarda la primera aparición en orden de documento
    fn keep_first(&mut self, field: Field, text: String) {
        let slot = self.slot(field);
        if slot.is_none() {
            *slot = Some(text);
        }
    }
}

/// Parsea la respuesta y clasifica el cambio. No compara versiones.
pub fn parse_registry_response(
    raw_xml: &str,
    template_code: &str,
) -> Result<UpdateCandidate, ParseError> {
    let document = scan_document(raw_xml)?;

    let new_version = required_text(document.version, VERSION_ELEMENT)?;
    let description = required_text(document.description, DESCRIPTION_ELEMENT)?;

    Ok(UpdateCandidate {
        template_code: template_code.to_string(),
        new_version,
        has_validation_changes: has_validation_changes(&description),
        description,
        raw_xml: raw_xml.to_string(),
    })
}

/// true si la descripción menciona alguna palabra con raíz "провер"
/// (проверка, проверки, проверяйте, ...), sin importar mayúsculas.
pub fn has_validation_changes(description: &str) -> bool {
    validation_keyword().is_match(description)
}

fn validation_keyword() -> &'static Regex {
    static KEYWORD: OnceLock<Regex> = OnceLock::new();
    KEYWORD.get_or_init(|| Regex::new(r"(?i)\bпровер\w*").expect("regex de palabras clave válida"))
}

fn new_reader(xml: &str) -> NsReader<&[u8]> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader
}

fn malformed(e: impl Display) -> ParseError {
    ParseError::Malformed(e.to_string())
}

fn owned_namespace(res: ResolveResult) -> Result<Option<Vec<u8>>, ParseError> {
    match res {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(ns.to_vec())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(ParseError::Malformed(format!(
            "prefijo de namespace sin declarar: {}",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

/// Una sola pasada: el primer elemento fija el namespace y los campos se
/// buscan calificados con él. Se recorre el documento completo, así el XML
/// roto se detecta aunque los datos aparezcan antes del error.
pub fn scan_document(xml: &str) -> Result<ScannedDocument, ParseError> {
    let mut reader = new_reader(xml);
    let mut document = ScannedDocument::default();
    let mut root: Option<Option<Vec<u8>>> = None;
    let mut depth = 0usize;
    // (campo, profundidad del elemento abierto, texto acumulado)
    let mut capture: Option<(Field, usize, String)> = None;

    loop {
        let (res, event) = reader.read_resolved_event().map_err(malformed)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                let namespace = owned_namespace(res)?;

                if depth == 0 {
                    if root.is_some() {
                        return Err(malformed("más de un elemento raíz"));
                    }
                    root = Some(namespace);
                } else if capture.is_none() && root.as_ref() == Some(&namespace) {
                    if let Some(field) = Field::from_local(e.local_name().as_ref()) {
                        if is_start {
                            capture = Some((field, depth + 1, String::new()));
                        } else {
                            document.keep_first(field, String::new());
                        }
                    }
                }

                if is_start {
                    depth += 1;
                }
            }
            Event::Text(_) | Event::CData(_) if depth == 0 => {
                return Err(malformed("texto fuera del elemento raíz"));
            }
            Event::Text(t) => {
                if let Some((_, _, text)) = capture.as_mut() {
                    text.push_str(&t.unescape().map_err(malformed)?);
                }
            }
            Event::CData(c) => {
                if let Some((_, _, text)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if matches!(capture, Some((_, open, _)) if open == depth) {
                    if let Some((field, _, text)) = capture.take() {
                        document.keep_first(field, text);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(malformed("el documento termina con elementos sin cerrar"));
    }
    document.root_namespace =
        root.ok_or_else(|| malformed("el documento no tiene elemento raíz"))?;
    Ok(document)
}

fn required_text(text: Option<String>, field: &'static str) -> Result<String, ParseError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(ParseError::MissingField(field)),
    }
}
