//! Typed view of the directory search payload.
//!
//! The portal omits fields freely, so every field is optional at every level.
//! A field of an unexpected type is read as absent; only entries that are not
//! objects at all are dropped from the batch.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Provider records extracted from a search response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPayload {
    /// Records that decoded successfully, in response order
    pub providers: Vec<ProviderRecord>,
    /// Number of entries that could not be decoded
    pub skipped: usize,
}

impl SearchPayload {
    /// Decode the `data` list of a search response.
    ///
    /// A missing or non-list `data` key yields an empty payload.
    #[must_use]
    pub fn from_value(body: &Value) -> Self {
        let Some(entries) = body.get("data").and_then(Value::as_array) else {
            return Self::default();
        };

        let mut payload = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            if !entry.is_object() {
                tracing::warn!("Skipping provider record #{}: not an object", index);
                payload.skipped += 1;
                continue;
            }
            match ProviderRecord::deserialize(entry) {
                Ok(record) => payload.providers.push(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed provider record #{}: {}", index, e);
                    payload.skipped += 1;
                }
            }
        }
        payload
    }
}

/// Whether a search response carries nothing at all (`null`, `{}`, `[]` or `""`).
#[must_use]
pub fn is_empty_response(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// One provider entry of the `data` list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderRecord {
    /// Given name
    #[serde(rename = "prenom", deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(rename = "nom", deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    /// Profession and specialty
    #[serde(deserialize_with = "lenient_object")]
    pub profession: Option<Profession>,
    /// Street address
    #[serde(rename = "voie", deserialize_with = "lenient_string")]
    pub street: Option<String>,
    /// Address complement
    #[serde(deserialize_with = "lenient_string")]
    pub complement: Option<String>,
    /// Town
    #[serde(rename = "ville", deserialize_with = "lenient_string")]
    pub town: Option<String>,
    /// Postal code (sometimes sent as a number)
    #[serde(rename = "codePostal", deserialize_with = "lenient_string")]
    pub postal_code: Option<String>,
    /// Practice coordinates
    #[serde(deserialize_with = "lenient_object")]
    pub geocode: Option<Geocode>,
    /// Contact details
    #[serde(rename = "coordonnees", deserialize_with = "lenient_object")]
    pub contact: Option<Contact>,
    /// Vitale card acceptance (sometimes sent as 0/1)
    #[serde(rename = "carteVitale", deserialize_with = "lenient_bool")]
    pub vitale_card: Option<bool>,
}

impl ProviderRecord {
    /// `profession.specialite.libelle`, if every level is present.
    #[must_use]
    pub fn specialty_label(&self) -> Option<&str> {
        self.profession
            .as_ref()?
            .specialty
            .as_ref()?
            .label
            .as_deref()
    }

    /// `geocode.latitude`
    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.geocode.as_ref()?.latitude
    }

    /// `geocode.longitude`
    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.geocode.as_ref()?.longitude
    }

    /// `coordonnees.numTel`
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.contact.as_ref()?.phone.as_deref()
    }
}

/// `profession` object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Profession {
    /// `specialite` object
    #[serde(rename = "specialite", deserialize_with = "lenient_object")]
    pub specialty: Option<Specialty>,
}

/// `profession.specialite` object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Specialty {
    /// Human-readable label
    #[serde(rename = "libelle", deserialize_with = "lenient_string")]
    pub label: Option<String>,
}

/// `geocode` object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Geocode {
    /// Latitude in decimal degrees (sometimes sent as a string)
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees (sometimes sent as a string)
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
}

/// `coordonnees` object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Contact {
    /// Phone number (sometimes sent as a number)
    #[serde(rename = "numTel", deserialize_with = "lenient_string")]
    pub phone: Option<String>,
}

fn ignored<T>(expected: &str, value: &Value) -> Option<T> {
    tracing::warn!("Ignoring field value {}: expected {}", value, expected);
    None
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Null) | None => None,
        Some(other) => ignored("a string or number", &other),
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => match s.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => ignored("a number", &Value::String(s)),
        },
        Some(Value::Null) | None => None,
        Some(other) => ignored("a number", &other),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) if n.as_u64() == Some(0) => Some(false),
        Some(Value::Number(n)) if n.as_u64() == Some(1) => Some(true),
        Some(Value::Null) | None => None,
        Some(other) => ignored("a boolean or 0/1", &other),
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => match T::deserialize(value) {
            Ok(inner) => Some(inner),
            Err(e) => {
                tracing::warn!("Ignoring malformed nested object: {}", e);
                None
            }
        },
        Some(Value::Null) | None => None,
        Some(other) => ignored("an object", &other),
    })
}
