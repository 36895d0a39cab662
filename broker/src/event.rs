use std::{borrow::Borrow, fmt, sync::Arc};

/// The key events are published and subscribed under.
///
/// Event types are application-defined strings; the broker never validates or registers them
/// up front. Cloning is cheap since the underlying string is shared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventType(Arc<str>);

impl EventType {
    /// Create a new event type from any string-like value.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Get the event type as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&EventType> for EventType {
    fn from(event_type: &EventType) -> Self {
        event_type.clone()
    }
}

impl Borrow<str> for EventType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for EventType {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for EventType {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn equal_names_are_equal_types() {
        assert_eq!(EventType::from("location"), EventType::from("location".to_string()));
        assert_ne!(EventType::from("location"), EventType::from("heading"));
    }

    #[test]
    fn compares_against_str() {
        let event_type = EventType::new("speed");
        assert_eq!(event_type, "speed");
        assert_eq!(event_type.as_str(), "speed");
        assert_eq!(event_type.to_string(), "speed");
    }

    #[test]
    fn lookup_by_str_key() {
        let mut map = HashMap::new();
        map.insert(EventType::new("speed"), 1);

        assert_eq!(map.get("speed"), Some(&1));
        assert_eq!(map.get("heading"), None);
    }
}
