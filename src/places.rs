//! Municipality names and the strings derived from them for external lookups.

use crate::agenda::model::Event;
use lazy_static::lazy_static;
use std::collections::HashMap;
use voca_rs::manipulate;

const ISLAND: &str = "Tenerife";
const COUNTRY: &str = "España";

lazy_static! {
    static ref MUNICIPALITIES: HashMap<&'static str, &'static str> = HashMap::from([
        ("Adeje", "Adeje"),
        ("Arafo", "Arafo"),
        ("Arona", "Arona"),
        ("Buenavista", "Buenavista del Norte"),
        ("Candelaria", "Candelaria"),
        ("Rosario", "El Rosario"),
        ("Sauzal", "El Sauzal"),
        ("Tanque", "El Tanque"),
        ("Fasnia", "Fasnia"),
        ("Garachico", "Garachico"),
        ("Granadilla", "Granadilla de Abona"),
        ("Guancha", "La Guancha"),
        ("Guía", "Guía de Isora"),
        ("Güímar", "Güímar"),
        ("Icod", "Icod de los Vinos"),
        ("Matanza", "La Matanza de Acentejo"),
        ("Orotava", "La Orotava"),
        ("Puerto", "Puerto de la Cruz"),
        ("Realejos", "Los Realejos"),
        ("Laguna", "San Cristóbal de La Laguna"),
        ("San Juan Rambla", "San Juan de la Rambla"),
        ("San Miguel", "San Miguel de Abona"),
        ("Santa Cruz", "Santa Cruz de Tenerife"),
        ("Santa Úrsula", "Santa Úrsula"),
        ("Santiago Teide", "Santiago del Teide"),
        ("Tacoronte", "Tacoronte"),
        ("Tegueste", "Tegueste"),
        ("Victoria", "La Victoria de Acentejo"),
        ("Vilaflor", "Vilaflor de Chasna"),
        ("Silos", "Los Silos"),
    ]);
}

/// Full name of a municipality short code, or the code itself when unknown.
pub fn full_municipality_name(code: &str) -> &str {
    MUNICIPALITIES.get(code).copied().unwrap_or(code)
}

/// "lugar, Full Name, Tenerife, España"
pub fn geocoding_address(event: &Event) -> String {
    let municipality = full_municipality_name(&event.municipio);

    match &event.lugar {
        Some(lugar) => format!("{lugar}, {municipality}, {ISLAND}, {COUNTRY}"),
        None => format!("{municipality}, {ISLAND}, {COUNTRY}"),
    }
}

/// Name shown on a map location: the venue, else the municipality's full name.
pub fn location_name(event: &Event) -> String {
    event
        .lugar
        .clone()
        .unwrap_or_else(|| full_municipality_name(&event.municipio).to_string())
}

/**
Lowercase, accents stripped and whitespace removed, for file-like lookups.
"ñ" survives since it is a letter of its own in Spanish.

Not to be used for grouping: festivals compare names exactly.
*/
pub fn normalize_place_name(name: &str) -> String {
    name.to_lowercase()
        .split('ñ')
        .map(manipulate::latinise)
        .collect::<Vec<String>>()
        .join("ñ")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}
