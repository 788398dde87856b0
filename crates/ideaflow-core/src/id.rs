use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for server-assigned ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

fn next_local(prefix: &str) -> Spur {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    INTERNER.get_or_intern(format!("{prefix}_{n}"))
}

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $sigil:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string id, or return the existing handle.
            pub fn intern(s: &str) -> Self {
                Self(INTERNER.get_or_intern(s))
            }

            /// Resolve back to the string the server knows.
            pub fn as_str(&self) -> &'static str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a unique local id (e.g. `node_3`).
            pub fn with_prefix(prefix: &str) -> Self {
                Self(next_local(prefix))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($sigil, "{}"), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Interned handle for a canvas node id. 4 bytes, `Copy`, O(1) `Eq`/`Hash`.
    NodeId,
    "@"
);

interned_id!(
    /// Interned handle for a connection (edge) id.
    ConnectionId,
    "~"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("clx9a0b1c0000");
        let b = NodeId::intern("clx9a0b1c0000");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "clx9a0b1c0000");
    }

    #[test]
    fn local_ids_are_unique() {
        let a = NodeId::with_prefix("node");
        let b = NodeId::with_prefix("node");
        assert_ne!(a, b);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ConnectionId::intern("conn-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"conn-7\"");
        let back: ConnectionId = serde_json::from_str("\"conn-7\"").unwrap();
        assert_eq!(back, id);
        assert_eq!(format!("{id:?}"), "~conn-7");
    }
}
