use std::fmt;

/// A value that was either recognized as a known variant `T`, or is an
/// unrecognized raw value `Raw` kept for display and error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Recognized<T, Raw = u8> {
    Known(T),
    Unknown(Raw),
}

impl<T: Copy, Raw: Copy> Copy for Recognized<T, Raw> {}

impl<T, Raw: Copy> Recognized<T, Raw> {
    /// Classify `raw` with `parse`, keeping it as `Unknown` when it has no variant.
    pub fn from_raw(raw: Raw, parse: impl FnOnce(Raw) -> Option<T>) -> Self {
        parse(raw).map_or(Recognized::Unknown(raw), Recognized::Known)
    }
}

impl<T, Raw> Recognized<T, Raw> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Recognized::Known(t) => Some(t),
            Recognized::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Recognized::Known(_))
    }

    /// Convert into a `Result`, turning the raw value into an error.
    pub fn known_or_else<E>(self, err: impl FnOnce(Raw) -> E) -> Result<T, E> {
        match self {
            Recognized::Known(t) => Ok(t),
            Recognized::Unknown(raw) => Err(err(raw)),
        }
    }
}

impl<T, Raw> From<T> for Recognized<T, Raw> {
    fn from(value: T) -> Self {
        Recognized::Known(value)
    }
}

impl<T: fmt::Display, Raw: fmt::Display> fmt::Display for Recognized<T, Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recognized::Known(t) => t.fmt(f),
            Recognized::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        let parse = |v: u8| (v < 3).then_some(v * 10);
        assert_eq!(Recognized::from_raw(2u8, parse), Recognized::Known(20));
        let unknown: Recognized<u8, u8> = Recognized::from_raw(7, parse);
        assert!(!unknown.is_known());
        assert_eq!(unknown.to_string(), "unknown (7)");
        assert_eq!(unknown.known_or_else(|raw| raw + 1), Err(8));
    }
}
