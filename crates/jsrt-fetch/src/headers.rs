//! Web-style `Headers`: a case-insensitive multimap preserving insertion
//! order.

/// Header list. Names are normalized to lowercase on entry.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Headers::default()
    }

    /// Add a value without replacing existing ones.
    pub fn append(&mut self, name: &str, value: &str) {
        self.entries
            .push((name.to_ascii_lowercase(), value.trim().to_string()));
    }

    /// Replace all values for a name.
    pub fn set(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        self.entries.retain(|(n, _)| *n != key);
        self.entries.push((key, value.trim().to_string()));
    }

    /// Combined value: all values for the name joined with `", "`, per
    /// the Web Headers contract.
    pub fn get(&self, name: &str) -> Option<String> {
        let key = name.to_ascii_lowercase();
        let values: Vec<&str> = self
            .entries
            .iter()
            .filter(|(n, _)| *n == key)
            .map(|(_, v)| v.as_str())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    pub fn has(&self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        self.entries.iter().any(|(n, _)| *n == key)
    }

    pub fn delete(&mut self, name: &str) {
        let key = name.to_ascii_lowercase();
        self.entries.retain(|(n, _)| *n != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(&name, &value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_access() {
        let mut headers = Headers::new();
        headers.append("Content-Type", "application/json");
        assert_eq!(headers.get("content-type").as_deref(), Some("application/json"));
        assert!(headers.has("CONTENT-TYPE"));
    }

    #[test]
    fn test_append_joins_values() {
        let mut headers = Headers::new();
        headers.append("Accept", "text/html");
        headers.append("accept", "application/json");
        assert_eq!(
            headers.get("Accept").as_deref(),
            Some("text/html, application/json")
        );
    }

    #[test]
    fn test_set_replaces() {
        let mut headers = Headers::new();
        headers.append("X-A", "1");
        headers.append("X-A", "2");
        headers.set("x-a", "3");
        assert_eq!(headers.get("X-A").as_deref(), Some("3"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut headers = Headers::new();
        headers.append("X-A", "1");
        headers.delete("x-a");
        assert!(headers.get("X-A").is_none());
    }

    #[test]
    fn test_values_trimmed() {
        let mut headers = Headers::new();
        headers.append("X-A", "  padded  ");
        assert_eq!(headers.get("X-A").as_deref(), Some("padded"));
    }
}
