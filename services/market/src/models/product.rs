//! Product, category and search models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product availability lifecycle. Only `Available -> Sold` (through the
/// purchase workflow) and `Available -> Reserved` are legal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "disponible")]
    Available,
    #[serde(rename = "reservado")]
    Reserved,
    #[serde(rename = "vendido")]
    Sold,
}

impl Availability {
    /// Database tag for this state
    pub fn as_str(self) -> &'static str {
        match self {
            Availability::Available => "disponible",
            Availability::Reserved => "reservado",
            Availability::Sold => "vendido",
        }
    }

    /// Parse a database tag
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "disponible" => Some(Availability::Available),
            "reservado" => Some(Availability::Reserved),
            "vendido" => Some(Availability::Sold),
            _ => None,
        }
    }
}

/// Product entity
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    #[serde(rename = "producto_id")]
    pub id: i32,
    #[serde(rename = "nombre_producto")]
    pub name: String,
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "precio")]
    pub price: Decimal,
    #[serde(rename = "disponibilidad")]
    pub availability: Availability,
    #[serde(rename = "localizacion")]
    pub location: String,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i32>,
    #[serde(rename = "vendedor_id")]
    pub seller_id: i32,
    #[serde(rename = "fecha_publicacion")]
    pub published_at: DateTime<Utc>,
}

/// Listing creation payload; the category is referenced by name and must
/// resolve to an existing row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    #[serde(rename = "nombre_producto")]
    pub name: String,
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "precio")]
    pub price: Decimal,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "localizacion")]
    pub location: String,
    #[serde(rename = "categoria")]
    pub category: String,
}

/// Product patch. Absent fields are skipped; present fields are applied
/// even when falsy. `categoria` resolves name to id as part of the same
/// update and fails the whole update when unknown.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    #[serde(rename = "nombre_producto")]
    pub name: Option<String>,
    #[serde(rename = "marca")]
    pub brand: Option<String>,
    #[serde(rename = "modelo")]
    pub model: Option<String>,
    #[serde(rename = "precio")]
    pub price: Option<Decimal>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "localizacion")]
    pub location: Option<String>,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
}

/// Free-form search filters; at least one must be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "localizacion")]
    pub location: Option<String>,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
}

impl ProductQuery {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.category.is_none()
    }
}

/// Category entity; `name` is the human-facing lookup key used by every
/// product-write path.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    #[serde(rename = "categoria_id")]
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_round_trips_database_tags() {
        for state in [
            Availability::Available,
            Availability::Reserved,
            Availability::Sold,
        ] {
            assert_eq!(Availability::parse(state.as_str()), Some(state));
        }
        assert_eq!(Availability::parse("agotado"), None);
    }

    #[test]
    fn availability_serializes_to_wire_tags() {
        let json = serde_json::to_string(&Availability::Sold).unwrap();
        assert_eq!(json, "\"vendido\"");
    }

    #[test]
    fn empty_query_is_detected() {
        assert!(ProductQuery::default().is_empty());
        let query = ProductQuery {
            location: Some("Madrid".to_string()),
            ..Default::default()
        };
        assert!(!query.is_empty());
    }
}
