use fxhash::FxHashMap as HashMap;

/// A multi-map of HTTP headers with case-insensitive keys (lowercased on
/// insert) that preserves insertion order per key (spec §3 HTTP message,
/// §8 "Idempotent header ops").
#[derive(Debug, Clone, Default)]
pub struct Headers {
    // Preserves the order keys were first seen, independent of the
    // underlying hash map's iteration order.
    order: Vec<String>,
    values: HashMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize_key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    fn normalize_value(value: &str) -> String {
        value.trim().to_string()
    }

    /// Appends a value for `name`, keeping any existing values.
    pub fn add_header(&mut self, name: &str, value: &str) {
        let key = Self::normalize_key(name);
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.entry(key).or_default().push(Self::normalize_value(value));
    }

    /// Replaces every existing value for `name` with the single value
    /// `value`. Calling this any number of times leaves exactly one value
    /// for `name` (spec §8 idempotency).
    pub fn set_header(&mut self, name: &str, value: &str) {
        let key = Self::normalize_key(name);
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.insert(key, vec![Self::normalize_value(value)]);
    }

    /// Bulk-replace: each `(name, values)` pair replaces that header's
    /// entire value list.
    pub fn set_headers<I, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (String, V)>,
        V: IntoIterator<Item = String>,
    {
        for (name, values) in headers {
            let key = Self::normalize_key(&name);
            if !self.values.contains_key(&key) {
                self.order.push(key.clone());
            }
            self.values.insert(key, values.into_iter().map(|v| Self::normalize_value(&v)).collect());
        }
    }

    pub fn all_values(&self, name: &str) -> &[String] {
        self.values.get(&Self::normalize_key(name)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.all_values(name).first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&Self::normalize_key(name))
    }

    pub fn remove(&mut self, name: &str) {
        let key = Self::normalize_key(name);
        if self.values.remove(&key).is_some() {
            self.order.retain(|k| k != &key);
        }
    }

    /// Iterates `(name, values)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order.iter().map(|k| (k.as_str(), self.values[k].as_slice()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.add_header(&k, &v);
        }
        headers
    }
}
