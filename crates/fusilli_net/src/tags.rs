//! Message tags for the tagged-pair wire protocol.
//!
//! Every server→client message is a `(tag, content)` pair; the tag fixes both
//! the action and the component kind. The mapping is static and part of the
//! protocol — the values here must never change.

use fusilli_types::ComponentKind;

// ── Server → client, no component kind ──────────────────────────────────────

/// Document update carrying `methods_list` and `signals_list`.
pub const DOCUMENT_UPDATE: u8 = 31;
/// Document reset.
pub const DOCUMENT_RESET: u8 = 32;
/// Signal invocation (carries an `Invoke` record).
pub const SIGNAL_INVOKE: u8 = 33;
/// Method reply (carries a `Reply` record).
pub const METHOD_REPLY: u8 = 34;
/// Introduction complete.
pub const DOCUMENT_INITIALIZED: u8 = 35;

// ── Client → server ─────────────────────────────────────────────────────────

/// Client introduction (`{client_name}`), the first message on a connection.
pub const CLIENT_INTRO: u8 = 0;
/// Client method invocation.
pub const CLIENT_INVOKE: u8 = 1;

/// Tag of the create message for a component kind.
#[must_use]
pub const fn create(kind: ComponentKind) -> u8 {
    match kind {
        ComponentKind::Method => 0,
        ComponentKind::Signal => 2,
        ComponentKind::Entity => 4,
        ComponentKind::Plot => 7,
        ComponentKind::Buffer => 10,
        ComponentKind::BufferView => 12,
        ComponentKind::Material => 14,
        ComponentKind::Image => 17,
        ComponentKind::Texture => 19,
        ComponentKind::Sampler => 21,
        ComponentKind::Light => 23,
        ComponentKind::Geometry => 26,
        ComponentKind::Table => 28,
    }
}

/// Tag of the delete message for a component kind.
#[must_use]
pub const fn delete(kind: ComponentKind) -> u8 {
    match kind {
        ComponentKind::Method => 1,
        ComponentKind::Signal => 3,
        ComponentKind::Entity => 6,
        ComponentKind::Plot => 9,
        ComponentKind::Buffer => 11,
        ComponentKind::BufferView => 13,
        ComponentKind::Material => 16,
        ComponentKind::Image => 18,
        ComponentKind::Texture => 20,
        ComponentKind::Sampler => 22,
        ComponentKind::Light => 25,
        ComponentKind::Geometry => 27,
        ComponentKind::Table => 30,
    }
}

/// Tag of the update message for a component kind, if the kind has one.
#[must_use]
pub const fn update(kind: ComponentKind) -> Option<u8> {
    match kind {
        ComponentKind::Entity => Some(5),
        ComponentKind::Plot => Some(8),
        ComponentKind::Material => Some(15),
        ComponentKind::Light => Some(24),
        ComponentKind::Table => Some(29),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tags() {
        let expected: [(ComponentKind, u8); 13] = [
            (ComponentKind::Method, 0),
            (ComponentKind::Signal, 2),
            (ComponentKind::Entity, 4),
            (ComponentKind::Plot, 7),
            (ComponentKind::Buffer, 10),
            (ComponentKind::BufferView, 12),
            (ComponentKind::Material, 14),
            (ComponentKind::Image, 17),
            (ComponentKind::Texture, 19),
            (ComponentKind::Sampler, 21),
            (ComponentKind::Light, 23),
            (ComponentKind::Geometry, 26),
            (ComponentKind::Table, 28),
        ];
        for (kind, tag) in expected {
            assert_eq!(create(kind), tag, "create tag for {kind}");
        }
    }

    #[test]
    fn test_delete_tags() {
        let expected: [(ComponentKind, u8); 13] = [
            (ComponentKind::Method, 1),
            (ComponentKind::Signal, 3),
            (ComponentKind::Entity, 6),
            (ComponentKind::Plot, 9),
            (ComponentKind::Buffer, 11),
            (ComponentKind::BufferView, 13),
            (ComponentKind::Material, 16),
            (ComponentKind::Image, 18),
            (ComponentKind::Texture, 20),
            (ComponentKind::Sampler, 22),
            (ComponentKind::Light, 25),
            (ComponentKind::Geometry, 27),
            (ComponentKind::Table, 30),
        ];
        for (kind, tag) in expected {
            assert_eq!(delete(kind), tag, "delete tag for {kind}");
        }
    }

    #[test]
    fn test_update_tags_only_for_updatable_kinds() {
        assert_eq!(update(ComponentKind::Entity), Some(5));
        assert_eq!(update(ComponentKind::Plot), Some(8));
        assert_eq!(update(ComponentKind::Material), Some(15));
        assert_eq!(update(ComponentKind::Light), Some(24));
        assert_eq!(update(ComponentKind::Table), Some(29));
        for kind in [
            ComponentKind::Method,
            ComponentKind::Signal,
            ComponentKind::Buffer,
            ComponentKind::BufferView,
            ComponentKind::Image,
            ComponentKind::Texture,
            ComponentKind::Sampler,
            ComponentKind::Geometry,
        ] {
            assert_eq!(update(kind), None, "update tag for {kind}");
        }
    }

    #[test]
    fn test_all_tags_disjoint_and_in_range() {
        let mut seen = std::collections::HashSet::new();
        for kind in ComponentKind::ALL {
            assert!(seen.insert(create(kind)));
            assert!(seen.insert(delete(kind)));
            if let Some(tag) = update(kind) {
                assert!(seen.insert(tag));
            }
        }
        for tag in [
            DOCUMENT_UPDATE,
            DOCUMENT_RESET,
            SIGNAL_INVOKE,
            METHOD_REPLY,
            DOCUMENT_INITIALIZED,
        ] {
            assert!(seen.insert(tag));
        }
        assert_eq!(seen.len(), 36);
        assert!(seen.iter().all(|tag| *tag <= 35));
    }
}
