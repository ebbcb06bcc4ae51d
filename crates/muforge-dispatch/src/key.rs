use std::fmt;

/// What a handler subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Events whose type equals this string exactly.
    Exact(String),
    /// Every event, whatever its type.
    Wildcard,
}

impl EventKey {
    /// Returns `true` if an event of `event_type` should reach this key.
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            Self::Exact(t) => t == event_type,
            Self::Wildcard => true,
        }
    }
}

impl From<&str> for EventKey {
    fn from(event_type: &str) -> Self {
        Self::Exact(event_type.to_string())
    }
}

impl From<String> for EventKey {
    fn from(event_type: String) -> Self {
        Self::Exact(event_type)
    }
}

/// `None` means "no particular type", i.e. the wildcard.
impl From<Option<&str>> for EventKey {
    fn from(event_type: Option<&str>) -> Self {
        event_type.map_or(Self::Wildcard, Self::from)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(t) => f.write_str(t),
            Self::Wildcard => f.write_str("<any>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(EventKey::from("Foo"), EventKey::Exact("Foo".into()));
        assert_eq!(EventKey::from(String::from("Foo")), EventKey::Exact("Foo".into()));
        assert_eq!(EventKey::from(Some("Foo")), EventKey::Exact("Foo".into()));
        assert_eq!(EventKey::from(None::<&str>), EventKey::Wildcard);
    }

    #[test]
    fn test_star_is_an_ordinary_event_type() {
        let star = EventKey::from("*");
        assert_ne!(star, EventKey::Wildcard);
        assert!(star.matches("*"));
        assert!(!star.matches("Foo"));
        assert!(EventKey::Wildcard.matches("Foo"));
    }
}
