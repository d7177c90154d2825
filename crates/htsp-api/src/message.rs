// ── HTSP message model ──
//
// An `HtspMessage` is an ordered list of named, typed fields. The same
// shape is used for requests, replies, and push events; the presence of
// `seq` and `method` decides how the correlator routes it.

use bytes::Bytes;

/// Field name carrying the correlation key.
pub const SEQ_FIELD: &str = "seq";
/// Field name carrying the request or push-event kind.
pub const METHOD_FIELD: &str = "method";

/// A single typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Map(HtspMessage),
    S64(i64),
    Str(String),
    Bin(Bytes),
    List(Vec<Value>),
    Dbl(f64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view. Booleans read as 0/1, which matches how older
    /// servers encode flags.
    pub fn as_s64(&self) -> Option<i64> {
        match self {
            Self::S64(n) => Some(*n),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HtspMessage> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::S64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::S64(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::S64(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Dbl(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Bin(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bin(Bytes::from(v))
    }
}

impl From<HtspMessage> for Value {
    fn from(v: HtspMessage) -> Self {
        Self::Map(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

// ── HtspMessage ──────────────────────────────────────────────────────

/// An ordered, keyed field set.
///
/// Field order is preserved for encoding. Setting a name that already
/// exists replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtspMessage {
    fields: Vec<(String, Value)>,
}

impl HtspMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request (or push event) of the given kind.
    pub fn method(name: &str) -> Self {
        Self::new().with(METHOD_FIELD, name)
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style set that skips `None`.
    #[must_use]
    pub fn with_opt<V: Into<Value>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Append without replacing. Used by the decoder, where duplicates
    /// (e.g. unnamed list entries) are legal.
    pub(crate) fn push(&mut self, name: String, value: Value) {
        self.fields.push((name, value));
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // ── Typed getters ────────────────────────────────────────────────

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn s64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_s64)
    }

    pub fn u32(&self, name: &str) -> Option<u32> {
        self.s64(name).and_then(|n| u32::try_from(n).ok())
    }

    pub fn i32(&self, name: &str) -> Option<i32> {
        self.s64(name).and_then(|n| i32::try_from(n).ok())
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.s64(name).map(|n| n != 0)
    }

    pub fn bin(&self, name: &str) -> Option<&[u8]> {
        match self.get(name)? {
            Value::Bin(b) => Some(b),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_list)
    }

    pub fn map(&self, name: &str) -> Option<&HtspMessage> {
        self.get(name).and_then(Value::as_map)
    }

    // ── Routing helpers ──────────────────────────────────────────────

    /// The request or push-event kind, if any.
    pub fn method_name(&self) -> Option<&str> {
        self.str(METHOD_FIELD)
    }

    /// The correlation key, if any.
    pub fn seq(&self) -> Option<u32> {
        self.u32(SEQ_FIELD)
    }

    /// Server-provided failure text.
    pub fn error(&self) -> Option<&str> {
        self.str("error")
    }

    /// `true` when the server refused the request for lack of privileges.
    pub fn no_access(&self) -> bool {
        self.bool("noaccess").unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut msg = HtspMessage::method("hello").with("htspversion", 34_i64);
        msg.set("htspversion", 35_i64);
        assert_eq!(msg.len(), 2);
        assert_eq!(msg.s64("htspversion"), Some(35));
        assert_eq!(msg.fields().next().map(|(n, _)| n), Some("method"));
    }

    #[test]
    fn typed_getters_reject_wrong_types() {
        let msg = HtspMessage::new()
            .with("name", "BBC One")
            .with("number", 101_i64);
        assert_eq!(msg.str("number"), None);
        assert_eq!(msg.s64("name"), None);
        assert_eq!(msg.u32("number"), Some(101));
    }

    #[test]
    fn u32_rejects_out_of_range() {
        let msg = HtspMessage::new().with("id", -1_i64);
        assert_eq!(msg.u32("id"), None);
        assert_eq!(msg.i32("id"), Some(-1));
    }

    #[test]
    fn bool_reads_integers() {
        let msg = HtspMessage::new().with("noaccess", 1_i64);
        assert!(msg.no_access());
        assert_eq!(HtspMessage::new().bool("noaccess"), None);
    }

    #[test]
    fn routing_helpers() {
        let msg = HtspMessage::method("getTicket")
            .with(SEQ_FIELD, 7_u32)
            .with("error", "No such channel");
        assert_eq!(msg.method_name(), Some("getTicket"));
        assert_eq!(msg.seq(), Some(7));
        assert_eq!(msg.error(), Some("No such channel"));
        assert!(!msg.no_access());
    }

    #[test]
    fn with_opt_skips_none() {
        let msg = HtspMessage::new()
            .with_opt("a", Some(1_i64))
            .with_opt::<i64>("b", None);
        assert!(msg.contains("a"));
        assert!(!msg.contains("b"));
    }
}
