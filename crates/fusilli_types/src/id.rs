//! Typed component identifiers.
//!
//! Every component kind has its own identifier space. An identifier is a
//! `(slot, generation)` pair; when a slot is recycled it comes back with the
//! generation bumped, so a stale handle never aliases a live component. On
//! the wire an identifier is the two-element CBOR array `[slot, gen]`.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::refs::VisitRefs;

/// A raw `(slot, generation)` pair.
///
/// Raw identifiers are only meaningful together with a [`ComponentKind`];
/// use the typed wrappers ([`EntityId`], [`BufferId`], …) or [`AnyId`] to
/// carry the kind alongside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id {
    /// Index into the kind's identifier space.
    pub slot: u32,
    /// Bumped every time the slot is recycled.
    pub generation: u32,
}

impl Id {
    /// Create an identifier from its raw parts.
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "|{}/{}|", self.slot, self.generation)
    }
}

// Wire form is the flat array `[slot, gen]`, not a field map.
impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.slot)?;
        tuple.serialize_element(&self.generation)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = Id;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a [slot, generation] pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Id, A::Error> {
                let slot = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let generation = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(Id::new(slot, generation))
            }
        }

        deserializer.deserialize_tuple(2, IdVisitor)
    }
}

/// The thirteen concrete component kinds.
///
/// The implicit Document singleton is not a registry component and has no
/// kind here; its update/reset messages are dedicated tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Method,
    Signal,
    Entity,
    Plot,
    Buffer,
    BufferView,
    Material,
    Image,
    Texture,
    Sampler,
    Light,
    Geometry,
    Table,
}

impl ComponentKind {
    /// All kinds, in canonical tag-table order.
    pub const ALL: [ComponentKind; 13] = [
        ComponentKind::Method,
        ComponentKind::Signal,
        ComponentKind::Entity,
        ComponentKind::Plot,
        ComponentKind::Buffer,
        ComponentKind::BufferView,
        ComponentKind::Material,
        ComponentKind::Image,
        ComponentKind::Texture,
        ComponentKind::Sampler,
        ComponentKind::Light,
        ComponentKind::Geometry,
        ComponentKind::Table,
    ];

    /// Human-readable kind name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ComponentKind::Method => "Method",
            ComponentKind::Signal => "Signal",
            ComponentKind::Entity => "Entity",
            ComponentKind::Plot => "Plot",
            ComponentKind::Buffer => "Buffer",
            ComponentKind::BufferView => "BufferView",
            ComponentKind::Material => "Material",
            ComponentKind::Image => "Image",
            ComponentKind::Texture => "Texture",
            ComponentKind::Sampler => "Sampler",
            ComponentKind::Light => "Light",
            ComponentKind::Geometry => "Geometry",
            ComponentKind::Table => "Table",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A kind-tagged identifier, usable as a single key across all component
/// kinds. Equality and hashing include the kind, so identifiers from
/// different kinds never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnyId {
    pub kind: ComponentKind,
    pub id: Id,
}

impl AnyId {
    #[must_use]
    pub const fn new(kind: ComponentKind, id: Id) -> Self {
        Self { kind, id }
    }
}

impl std::fmt::Display for AnyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind, self.id)
    }
}

macro_rules! typed_id {
    ($($(#[$meta:meta])* $name:ident => $kind:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, Default, PartialEq, Eq, Hash,
                PartialOrd, Ord, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub Id);

            impl $name {
                /// The component kind this identifier belongs to.
                pub const KIND: ComponentKind = ComponentKind::$kind;

                #[must_use]
                pub const fn new(slot: u32, generation: u32) -> Self {
                    Self(Id::new(slot, generation))
                }

                #[must_use]
                pub const fn slot(self) -> u32 {
                    self.0.slot
                }

                #[must_use]
                pub const fn generation(self) -> u32 {
                    self.0.generation
                }
            }

            impl From<$name> for AnyId {
                fn from(value: $name) -> Self {
                    AnyId::new(ComponentKind::$kind, value.0)
                }
            }

            impl From<Id> for $name {
                fn from(id: Id) -> Self {
                    Self(id)
                }
            }

            impl VisitRefs for $name {
                fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
                    visit((*self).into());
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}{}", Self::KIND, self.0)
                }
            }
        )+
    };
}

typed_id! {
    /// Identifier for a [`Method`](crate::Method) component.
    MethodId => Method,
    /// Identifier for a [`Signal`](crate::Signal) component.
    SignalId => Signal,
    /// Identifier for an [`Entity`](crate::Entity) component.
    EntityId => Entity,
    /// Identifier for a [`Plot`](crate::Plot) component.
    PlotId => Plot,
    /// Identifier for a [`Buffer`](crate::Buffer) component.
    BufferId => Buffer,
    /// Identifier for a [`BufferView`](crate::BufferView) component.
    BufferViewId => BufferView,
    /// Identifier for a [`Material`](crate::Material) component.
    MaterialId => Material,
    /// Identifier for an [`Image`](crate::Image) component.
    ImageId => Image,
    /// Identifier for a [`Texture`](crate::Texture) component.
    TextureId => Texture,
    /// Identifier for a [`Sampler`](crate::Sampler) component.
    SamplerId => Sampler,
    /// Identifier for a [`Light`](crate::Light) component.
    LightId => Light,
    /// Identifier for a [`Geometry`](crate::Geometry) component.
    GeometryId => Geometry,
    /// Identifier for a [`Table`](crate::Table) component.
    TableId => Table,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_wire_format_is_slot_gen_array() {
        let id = EntityId::new(3, 1);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&id, &mut bytes).unwrap();
        let value: ciborium::Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(
            value,
            ciborium::Value::Array(vec![3u32.into(), 1u32.into()])
        );
    }

    #[test]
    fn test_id_roundtrip() {
        let id = TableId::new(7, 2);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&id, &mut bytes).unwrap();
        let restored: TableId = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn test_any_id_distinguishes_kinds() {
        let method: AnyId = MethodId::new(0, 0).into();
        let signal: AnyId = SignalId::new(0, 0).into();
        assert_ne!(method, signal);
        assert_eq!(method, MethodId::new(0, 0).into());
    }

    #[test]
    fn test_display() {
        assert_eq!(LightId::new(2, 1).to_string(), "Light|2/1|");
        assert_eq!(
            AnyId::new(ComponentKind::Buffer, Id::new(0, 4)).to_string(),
            "Buffer|0/4|"
        );
    }
}
