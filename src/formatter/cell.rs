//! Conversion of BSON values into CSV cell text
//!
//! Cells are plain text: no type wrappers, no colors. Nested documents and
//! arrays are rendered as relaxed extended JSON so they survive a round trip
//! through a spreadsheet.

use mongodb::bson::{Binary, Bson, DateTime};

/// Core trait for BSON value conversion
pub trait BsonConverter {
    /// Output type of the conversion
    type Output;

    /// Convert a BSON value to the output type
    fn convert(&self, value: &Bson) -> Self::Output;
}

/// Plain text converter used for every exported cell
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextConverter;

impl PlainTextConverter {
    /// Create a new plain text converter
    pub fn new() -> Self {
        Self
    }
}

impl BsonConverter for PlainTextConverter {
    type Output = String;

    fn convert(&self, value: &Bson) -> String {
        match value {
            Bson::String(s) => s.clone(),
            Bson::Int32(n) => n.to_string(),
            Bson::Int64(n) => n.to_string(),
            Bson::Double(f) => f.to_string(),
            Bson::Boolean(b) => b.to_string(),
            Bson::Null | Bson::Undefined => String::new(),
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::DateTime(dt) => datetime_to_iso_string(dt),
            Bson::Decimal128(d) => d.to_string(),
            Bson::Binary(bin) => binary_to_hex(bin),
            Bson::Symbol(s) => s.clone(),
            Bson::RegularExpression(regex) => format!("/{}/{}", regex.pattern, regex.options),
            Bson::Timestamp(ts) => format!("Timestamp({}, {})", ts.time, ts.increment),
            Bson::MinKey => String::from("MinKey"),
            Bson::MaxKey => String::from("MaxKey"),
            other => other.clone().into_relaxed_extjson().to_string(),
        }
    }
}

/// Convert DateTime to an RFC 3339 string, or epoch millis when out of range
fn datetime_to_iso_string(dt: &DateTime) -> String {
    dt.try_to_rfc3339_string()
        .unwrap_or_else(|_| dt.timestamp_millis().to_string())
}

fn binary_to_hex(bin: &Binary) -> String {
    hex::encode(&bin.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{bson, doc, oid::ObjectId};

    #[test]
    fn test_scalars() {
        let c = PlainTextConverter::new();
        assert_eq!(c.convert(&Bson::String("hello".into())), "hello");
        assert_eq!(c.convert(&Bson::Int32(7)), "7");
        assert_eq!(c.convert(&Bson::Int64(-3)), "-3");
        assert_eq!(c.convert(&Bson::Double(2.5)), "2.5");
        assert_eq!(c.convert(&Bson::Boolean(true)), "true");
        assert_eq!(c.convert(&Bson::Null), "");
    }

    #[test]
    fn test_undefined_is_empty() {
        let c = PlainTextConverter::new();
        assert_eq!(c.convert(&Bson::Undefined), "");
    }

    #[test]
    fn test_object_id_as_hex() {
        let oid = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();
        let c = PlainTextConverter::new();
        assert_eq!(c.convert(&Bson::ObjectId(oid)), "65a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn test_datetime_rfc3339() {
        let dt = DateTime::from_millis(0);
        let c = PlainTextConverter::new();
        assert_eq!(c.convert(&Bson::DateTime(dt)), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_nested_values_as_json() {
        let c = PlainTextConverter::new();
        assert_eq!(c.convert(&bson!([1, 2])), "[1,2]");
        assert_eq!(
            c.convert(&Bson::Document(doc! { "name": "x" })),
            r#"{"name":"x"}"#
        );
    }
}
