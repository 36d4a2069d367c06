use std::collections::HashSet;

/// Trim whitespace and trailing slashes so `http://a:5000/` and
/// `http://a:5000` name the same node.
pub fn normalize(address: &str) -> Option<String> {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Set of known node addresses. Iteration order is unspecified.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerRegistry {
    addresses: HashSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: &str) -> bool {
        match normalize(address) {
            Some(a) => self.addresses.insert(a),
            None => false,
        }
    }

    pub fn remove(&mut self, address: &str) -> bool {
        normalize(address).is_some_and(|a| self.addresses.remove(&a))
    }

    pub fn contains(&self, address: &str) -> bool {
        normalize(address).is_some_and(|a| self.addresses.contains(&a))
    }

    /// Add every address, returning how many were new.
    pub fn extend<I, S>(&mut self, addresses: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        addresses
            .into_iter()
            .filter(|a| self.insert(a.as_ref()))
            .count()
    }

    /// Forget every known address and keep only `addresses`.
    pub fn replace<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.addresses.clear();
        self.extend(addresses);
    }

    /// Every known address except `address`.
    pub fn without(&self, address: &str) -> Vec<String> {
        let excluded = normalize(address);
        self.addresses
            .iter()
            .filter(|a| Some(*a) != excluded.as_ref())
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
