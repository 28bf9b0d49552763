use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumString, VariantNames};

/// The four primitive column types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TypeName {
    Number,
    String,
    Date,
    Boolean,
}

impl Serialize for TypeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

impl<'de> Deserialize<'de> for TypeName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        TypeName::from_str(&name).map_err(|_| {
            serde::de::Error::custom(format!(
                "unknown data type '{}', expected one of: {}",
                name,
                TypeName::VARIANTS.join(", ")
            ))
        })
    }
}

/// Locale-aware number formatting options
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumberFormatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerals: Option<Vec<char>>,
}

impl NumberFormatOptions {
    /// Whether any locale-specific option is configured
    pub fn is_configured(&self) -> bool {
        self.locale.is_some()
            || self.decimal.is_some()
            || self.group.is_some()
            || self.numerals.is_some()
    }
}

/// User-supplied decode function applied to a raw cell before type checking
#[derive(Clone)]
pub struct Decoder(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl Decoder {
    pub fn new(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn decode(&self, value: &Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Decoder(..)")
    }
}

impl PartialEq for Decoder {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Decoder {}

impl Hash for Decoder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

/// Column data type, optionally carrying formatting metadata.
///
/// In serialized form a data type is either a bare type name (`"number"`) or an
/// object with a `type` tag plus `dateFormat` or number locale options. A
/// [`Decoder`] never serializes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataType {
    kind: TypeName,
    date_format: Option<String>,
    number_format: NumberFormatOptions,
    decoder: Option<Decoder>,
}

impl DataType {
    pub fn new(kind: TypeName) -> Self {
        Self {
            kind,
            date_format: None,
            number_format: NumberFormatOptions::default(),
            decoder: None,
        }
    }

    pub fn number() -> Self {
        Self::new(TypeName::Number)
    }

    pub fn string() -> Self {
        Self::new(TypeName::String)
    }

    pub fn date() -> Self {
        Self::new(TypeName::Date)
    }

    pub fn boolean() -> Self {
        Self::new(TypeName::Boolean)
    }

    /// Date type parsed with a token format such as `DD/MM/YYYY`
    pub fn date_with_format(format: impl Into<String>) -> Self {
        Self::date().with_date_format(format)
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    pub fn with_number_format(mut self, options: NumberFormatOptions) -> Self {
        self.number_format = options;
        self
    }

    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn kind(&self) -> TypeName {
        self.kind
    }

    /// Lowercase name of the underlying type
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            TypeName::Number => "number",
            TypeName::String => "string",
            TypeName::Date => "date",
            TypeName::Boolean => "boolean",
        }
    }

    pub fn date_format(&self) -> Option<&str> {
        self.date_format.as_deref()
    }

    pub fn number_format(&self) -> &NumberFormatOptions {
        &self.number_format
    }

    pub fn decoder(&self) -> Option<&Decoder> {
        self.decoder.as_ref()
    }

    /// Whether the type carries anything beyond its tag
    pub fn has_metadata(&self) -> bool {
        self.date_format.is_some() || self.number_format.is_configured() || self.decoder.is_some()
    }
}

impl From<TypeName> for DataType {
    fn from(kind: TypeName) -> Self {
        DataType::new(kind)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DataTypeRepr {
    Name(TypeName),
    Detailed {
        #[serde(rename = "type")]
        kind: TypeName,
        #[serde(rename = "dateFormat", default, skip_serializing_if = "Option::is_none")]
        date_format: Option<String>,
        #[serde(flatten)]
        number_format: NumberFormatOptions,
    },
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = if self.date_format.is_none() && !self.number_format.is_configured() {
            DataTypeRepr::Name(self.kind)
        } else {
            DataTypeRepr::Detailed {
                kind: self.kind,
                date_format: self.date_format.clone(),
                number_format: self.number_format.clone(),
            }
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match DataTypeRepr::deserialize(deserializer)? {
            DataTypeRepr::Name(kind) => DataType::new(kind),
            DataTypeRepr::Detailed {
                kind,
                date_format,
                number_format,
            } => DataType {
                kind,
                date_format,
                number_format,
                decoder: None,
            },
        })
    }
}

/// Column name to data type, in column order
pub type DataTypes = IndexMap<String, DataType>;
