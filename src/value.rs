use bytes::Bytes;

/// A decoded reply from the store, as the client adapter hands it back.
///
/// Wire encoding and decoding belong to the adapter; this type only models
/// the shapes replies can take so the access layer can inspect them.
///
/// Ref: <https://redis.io/docs/reference/protocol-spec>
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Value>),
}

impl Value {
    /// Reads the value as an integer. Several commands return counters as
    /// bulk strings (cursors in particular), so string representations are
    /// parsed too.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Simple(s) => s.parse().ok(),
            Value::Bulk(bytes) => std::str::from_utf8(bytes).ok()?.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<Bytes> {
        match self {
            Value::Simple(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
            Value::Bulk(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}
