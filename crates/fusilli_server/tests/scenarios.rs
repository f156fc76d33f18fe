//! End-to-end scene engine scenarios, observed through an attached client.

use ciborium::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use fusilli_net::{Frame, MethodException, tags};
use fusilli_server::{MethodError, Scene, SceneError, Server, ServerConfig};
use fusilli_types::{
    AnyId, Buffer, BufferView, Component, ComponentKind, Entity, Geometry, GeometryPatch, Light,
    LightId, Material, Method, MethodId, PrimitiveType, Signal, Table, ValidationError,
};

/// A scene with one attached probe client whose frames we can inspect.
fn scene_with_probe() -> (Scene, UnboundedReceiver<Vec<u8>>) {
    let mut scene = Scene::new();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    scene.attach_client("probe", sender).unwrap();
    // Swallow the introduction frame; tests care about what follows.
    receiver.try_recv().unwrap();
    (scene, receiver)
}

/// Every `(tag, content)` pair sent since the last drain.
fn drain(receiver: &mut UnboundedReceiver<Vec<u8>>) -> Vec<(u8, Value)> {
    let mut pairs = Vec::new();
    while let Ok(bytes) = receiver.try_recv() {
        pairs.extend(Frame::decode(&bytes).unwrap().pairs().to_vec());
    }
    pairs
}

fn map_keys(value: &Value) -> Vec<String> {
    let Value::Map(entries) = value else {
        panic!("expected a map, got {value:?}");
    };
    entries
        .iter()
        .filter_map(|(key, _)| key.as_text().map(str::to_string))
        .collect()
}

fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let Value::Map(entries) = value else {
        return None;
    };
    entries
        .iter()
        .find(|(entry_key, _)| entry_key.as_text() == Some(key))
        .map(|(_, entry_value)| entry_value)
}

#[test]
fn test_light_one_of_validation() {
    let (mut scene, mut probe) = scene_with_probe();

    let bare = Light {
        name: Some("L".to_string()),
        ..Light::default()
    };
    let error = scene.create(bare).unwrap_err();
    assert!(matches!(
        error,
        SceneError::InvalidAttributes(ValidationError::ExclusiveFields { kind: "Light", .. })
    ));
    // Failed validation mutates nothing and broadcasts nothing.
    assert!(drain(&mut probe).is_empty());

    let mut light = Light::point();
    light.name = Some("L".to_string());
    let id = scene.create(light).unwrap();
    assert_eq!(id, LightId::new(0, 0));
    let pairs = drain(&mut probe);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0, tags::create(ComponentKind::Light));
}

#[test]
fn test_slot_recycling_bumps_generation() {
    let mut scene = Scene::new();
    let first = scene.create(Table::named("T")).unwrap();
    let second = scene.create(Table::named("T")).unwrap();
    assert_eq!(first.slot(), 0);
    assert_eq!(first.generation(), 0);
    assert_eq!(second.slot(), 1);

    scene.delete(first).unwrap();
    let third = scene.create(Table::named("T2")).unwrap();
    assert_eq!(third.slot(), 0);
    assert_eq!(third.generation(), 1);
}

#[test]
fn test_deferred_delete_cascades() {
    let (mut scene, mut probe) = scene_with_probe();
    let light = scene.create(Light::point()).unwrap();
    let entity = scene
        .create(Entity {
            lights: Some(vec![light]),
            ..Entity::default()
        })
        .unwrap();
    drain(&mut probe);

    // Still referenced: deferred, not removed, nothing broadcast.
    scene.delete(light).unwrap();
    assert!(scene.component(light.into()).is_ok());
    assert!(drain(&mut probe).is_empty());

    // Removing the referrer drains the queue.
    scene.delete(entity).unwrap();
    assert!(matches!(
        scene.component(light.into()),
        Err(SceneError::NotFound(_))
    ));
    let pairs = drain(&mut probe);
    let expected_tags: Vec<u8> = vec![
        tags::delete(ComponentKind::Entity),
        tags::delete(ComponentKind::Light),
    ];
    assert_eq!(
        pairs.iter().map(|(tag, _)| *tag).collect::<Vec<_>>(),
        expected_tags
    );

    // One delete broadcast per removed component, `{id}` only.
    assert_eq!(map_keys(&pairs[0].1), vec!["id"]);
}

#[test]
fn test_update_releases_reference_and_drains_queue() {
    let mut scene = Scene::new();
    let light = scene.create(Light::point()).unwrap();
    let entity = scene
        .create(Entity {
            lights: Some(vec![light]),
            ..Entity::default()
        })
        .unwrap();

    scene.delete(light).unwrap();
    assert!(scene.component(light.into()).is_ok());

    // Dropping the reference through an update frees the deferred delete.
    scene.get_mut::<Entity>(entity).unwrap().lights = None;
    scene.update(entity).unwrap();
    assert!(scene.component(light.into()).is_err());
}

#[test]
fn test_minimal_update() {
    let (mut scene, mut probe) = scene_with_probe();
    let entity = scene.create(Entity::named("a")).unwrap();
    drain(&mut probe);

    // No changes: no frame at all.
    scene.update(entity).unwrap();
    assert!(drain(&mut probe).is_empty());

    scene.get_mut::<Entity>(entity).unwrap().name = Some("b".to_string());
    scene.update(entity).unwrap();
    let pairs = drain(&mut probe);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0, tags::update(ComponentKind::Entity).unwrap());
    assert_eq!(map_keys(&pairs[0].1), vec!["id", "name"]);
    assert_eq!(
        map_get(&pairs[0].1, "name"),
        Some(&Value::Text("b".to_string()))
    );
}

#[test]
fn test_update_rejects_kinds_without_update_message() {
    let mut scene = Scene::new();
    let buffer = scene.create(Buffer::inline(vec![0, 1, 2])).unwrap();
    assert!(matches!(
        scene.update(buffer),
        Err(SceneError::Unupdatable(ComponentKind::Buffer))
    ));
}

fn invoke_payload(method: MethodId, invoke_id: &str, args: Vec<Value>) -> Value {
    Value::Map(vec![
        (
            Value::Text("method".to_string()),
            Value::Array(vec![
                Value::from(method.slot()),
                Value::from(method.generation()),
            ]),
        ),
        (
            Value::Text("invoke_id".to_string()),
            Value::Text(invoke_id.to_string()),
        ),
        (Value::Text("args".to_string()), Value::Array(args)),
    ])
}

fn as_i64(value: &Value) -> Option<i64> {
    value.as_integer().and_then(|i| i64::try_from(i128::from(i)).ok())
}

#[test]
fn test_method_dispatch_returns_result() {
    let mut scene = Scene::new();
    let method = scene
        .register_method(Method::new("sum"), |_scene, _context, args| {
            let (Some(x), Some(y)) = (
                args.first().and_then(as_i64),
                args.get(1).and_then(as_i64),
            ) else {
                return Err(MethodException::invalid_params().into());
            };
            Ok(Value::from(x + y))
        })
        .unwrap();

    let payload = invoke_payload(method, "7", vec![Value::from(2), Value::from(3)]);
    let reply = scene.handle_invoke(&payload);
    assert_eq!(reply.invoke_id, "7");
    assert_eq!(reply.result, Some(Value::from(5)));
    assert_eq!(reply.method_exception, None);
}

#[test]
fn test_method_reply_goes_to_invoker_only() {
    let mut scene = Scene::new();
    let (invoker_tx, mut invoker_rx) = mpsc::unbounded_channel();
    let (other_tx, mut other_rx) = mpsc::unbounded_channel();
    let invoker = scene.attach_client("invoker", invoker_tx).unwrap();
    scene.attach_client("other", other_tx).unwrap();
    drain(&mut invoker_rx);
    drain(&mut other_rx);

    let method = scene
        .register_method(Method::new("noop"), |_scene, _context, _args| {
            Ok(Value::Null)
        })
        .unwrap();
    drain(&mut invoker_rx);
    drain(&mut other_rx);

    let payload = invoke_payload(method, "1", vec![]);
    scene.dispatch_invoke(invoker, &payload).unwrap();

    let replies = drain(&mut invoker_rx);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, tags::METHOD_REPLY);
    assert!(drain(&mut other_rx).is_empty());
}

#[test]
fn test_method_not_found() {
    let mut scene = Scene::new();
    let payload = invoke_payload(MethodId::new(9, 0), "3", vec![]);
    let reply = scene.handle_invoke(&payload);
    assert_eq!(reply.invoke_id, "3");
    let exception = reply.method_exception.unwrap();
    assert_eq!(exception.code, MethodException::METHOD_NOT_FOUND);
    assert_eq!(exception.message.as_deref(), Some("Method Not Found"));
}

#[test]
fn test_parse_error_reply() {
    let mut scene = Scene::new();
    let reply = scene.handle_invoke(&Value::Text("not an invoke".to_string()));
    assert_eq!(reply.invoke_id, "-1");
    assert_eq!(
        reply.method_exception.unwrap().code,
        MethodException::PARSE_ERROR
    );
}

#[test]
fn test_method_exception_crosses_verbatim() {
    let mut scene = Scene::new();
    let method = scene
        .register_method(Method::new("fail"), |_scene, _context, _args| {
            Err(MethodException::new(-32000, "you asked for it")
                .with_data(Value::from(41))
                .into())
        })
        .unwrap();

    let reply = scene.handle_invoke(&invoke_payload(method, "2", vec![]));
    let exception = reply.method_exception.unwrap();
    assert_eq!(exception.code, -32000);
    assert_eq!(exception.message.as_deref(), Some("you asked for it"));
    assert_eq!(exception.data, Some(Value::from(41)));
    assert_eq!(reply.result, None);
}

#[test]
fn test_internal_errors_stay_opaque() {
    let mut scene = Scene::new();
    let failing = scene
        .register_method(Method::new("boom"), |_scene, _context, _args| {
            Err(MethodError::Internal(anyhow::anyhow!(
                "secret database password in here"
            )))
        })
        .unwrap();
    let reply = scene.handle_invoke(&invoke_payload(failing, "4", vec![]));
    let exception = reply.method_exception.unwrap();
    assert_eq!(exception.code, MethodException::INTERNAL_ERROR);
    assert_eq!(exception.message.as_deref(), Some("Internal Error"));
    assert_eq!(exception.data, None);

    let panicking = scene
        .register_method(Method::new("panic"), |_scene, _context, _args| {
            panic!("handler bug")
        })
        .unwrap();
    let reply = scene.handle_invoke(&invoke_payload(panicking, "5", vec![]));
    assert_eq!(
        reply.method_exception.unwrap().code,
        MethodException::INTERNAL_ERROR
    );
}

#[test]
fn test_handlers_can_mutate_scene_before_reply() {
    let mut scene = Scene::new();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let client = scene.attach_client("probe", sender).unwrap();
    drain(&mut receiver);

    let method = scene
        .register_method(Method::new("spawn"), |scene, _context, _args| {
            scene
                .create(Entity::named("spawned"))
                .map_err(|error| MethodError::Internal(error.into()))?;
            Ok(Value::Null)
        })
        .unwrap();
    drain(&mut receiver);

    scene
        .dispatch_invoke(client, &invoke_payload(method, "6", vec![]))
        .unwrap();

    // Side effects are observed before the reply on the same connection.
    let pairs = drain(&mut receiver);
    let tag_order: Vec<u8> = pairs.iter().map(|(tag, _)| *tag).collect();
    assert_eq!(
        tag_order,
        vec![tags::create(ComponentKind::Entity), tags::METHOD_REPLY]
    );
}

#[test]
fn test_topological_introduction() {
    let mut scene = Scene::new();
    let material = scene.create(Material::default()).unwrap();
    let buffer = scene.create(Buffer::inline(vec![0u8; 12])).unwrap();
    let view = scene.create(BufferView::new(buffer, 0, 12)).unwrap();
    scene
        .create(Geometry::new(vec![GeometryPatch {
            attributes: vec![fusilli_types::Attribute {
                view,
                semantic: fusilli_types::AttributeSemantic::Position,
                channel: None,
                offset: 0,
                stride: 12,
                format: fusilli_types::AttributeFormat::Vec3,
                minimum_value: None,
                maximum_value: None,
                normalized: false,
            }],
            vertex_count: 1,
            indices: None,
            primitive: PrimitiveType::Triangles,
            material,
        }]))
        .unwrap();

    let frame = scene.introduce().unwrap();
    let tag_order: Vec<u8> = frame.tags();
    assert_eq!(
        tag_order,
        vec![
            tags::create(ComponentKind::Material),
            tags::create(ComponentKind::Buffer),
            tags::create(ComponentKind::BufferView),
            tags::create(ComponentKind::Geometry),
            tags::DOCUMENT_UPDATE,
            tags::DOCUMENT_INITIALIZED,
        ]
    );
}

#[test]
fn test_introduction_reorders_referents_first() {
    let mut scene = Scene::new();
    // `first` is created before `second` but later points at it.
    let first = scene.create(Entity::named("first")).unwrap();
    let second = scene.create(Entity::named("second")).unwrap();
    scene.get_mut::<Entity>(first).unwrap().parent = Some(second);
    scene.update(first).unwrap();

    let frame = scene.introduce().unwrap();
    let created_names: Vec<String> = frame
        .pairs()
        .iter()
        .filter(|(tag, _)| *tag == tags::create(ComponentKind::Entity))
        .filter_map(|(_, content)| map_get(content, "name").and_then(|v| v.as_text()).map(str::to_string))
        .collect();
    assert_eq!(created_names, vec!["second", "first"]);
}

#[test]
fn test_document_update_lists_methods_and_signals() {
    let mut scene = Scene::new();
    scene
        .register_method(Method::new("a"), |_scene, _context, _args| Ok(Value::Null))
        .unwrap();
    scene.create(Signal::new("s")).unwrap();

    let frame = scene.introduce().unwrap();
    let (_, document) = frame
        .pairs()
        .iter()
        .find(|(tag, _)| *tag == tags::DOCUMENT_UPDATE)
        .unwrap();
    let methods = map_get(document, "methods_list").unwrap();
    let signals = map_get(document, "signals_list").unwrap();
    assert_eq!(
        methods,
        &Value::Array(vec![Value::Array(vec![Value::from(0), Value::from(0)])])
    );
    assert_eq!(
        signals,
        &Value::Array(vec![Value::Array(vec![Value::from(0), Value::from(0)])])
    );
}

#[test]
fn test_invoke_signal_builds_context_from_target_kind() {
    let (mut scene, mut probe) = scene_with_probe();
    let signal = scene.create(Signal::new("moved")).unwrap();
    let entity = scene.create(Entity::named("e")).unwrap();
    let material = scene.create(Material::default()).unwrap();
    drain(&mut probe);

    scene
        .invoke_signal(signal, entity, vec![Value::from(1)])
        .unwrap();
    let pairs = drain(&mut probe);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0, tags::SIGNAL_INVOKE);
    let context = map_get(&pairs[0].1, "context").unwrap();
    assert_eq!(map_keys(context), vec!["entity"]);

    assert!(matches!(
        scene.invoke_signal(signal, material, vec![]),
        Err(SceneError::InvalidTarget(ComponentKind::Material))
    ));
}

#[test]
fn test_by_name_returns_first_match() {
    let mut scene = Scene::new();
    let first = scene.create(Table::named("shared")).unwrap();
    scene.create(Table::named("shared")).unwrap();
    assert_eq!(
        scene.by_name(ComponentKind::Table, "shared"),
        Some(first.into())
    );
    assert_eq!(scene.by_name(ComponentKind::Table, "missing"), None);
    // Kinds are distinguished even with equal names.
    assert_eq!(scene.by_name(ComponentKind::Entity, "shared"), None);
}

#[test]
fn test_behavior_override_keeps_state_off_the_wire() {
    struct TableWithRows {
        component: Component,
        rows: Vec<i64>,
    }

    impl fusilli_server::Delegate for TableWithRows {
        fn component(&self) -> &Component {
            &self.component
        }

        fn component_mut(&mut self) -> &mut Component {
            &mut self.component
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    let (mut scene, mut probe) = scene_with_probe();
    scene.register_override(ComponentKind::Table, |component| TableWithRows {
        component,
        rows: vec![1, 2, 3],
    });

    let table = scene.create(Table::named("data")).unwrap();
    let any: AnyId = table.into();

    // The stored instance is the override, with its extra state intact.
    let delegate = scene.delegate(any).unwrap();
    let with_rows = delegate.as_any().downcast_ref::<TableWithRows>().unwrap();
    assert_eq!(with_rows.rows, vec![1, 2, 3]);

    // The wire saw only the base component's fields.
    let pairs = drain(&mut probe);
    assert_eq!(map_keys(&pairs[0].1), vec!["id", "name"]);
}

#[test]
fn test_delete_missing_component_is_an_error() {
    let mut scene = Scene::new();
    assert!(matches!(
        scene.delete(LightId::new(0, 0)),
        Err(SceneError::NotFound(_))
    ));
}

#[test]
fn test_server_starting_state_is_populated_before_run() {
    let server = Server::with_starting_state(
        ServerConfig::new().with_bind("127.0.0.1:0"),
        |scene| {
            scene.register_method(Method::new("ping"), |_scene, _context, _args| {
                Ok(Value::Null)
            })?;
            scene.create(Entity::named("root"))?;
            Ok(())
        },
    )
    .unwrap();

    let scene = server.scene();
    assert!(scene.by_name(ComponentKind::Method, "ping").is_some());
    assert!(scene.by_name(ComponentKind::Entity, "root").is_some());
    assert_eq!(scene.client_count(), 0);
}

#[test]
fn test_message_log_records_outbound_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.json");
    let mut scene = Scene::with_message_log(&path).unwrap();
    scene.create(Entity::named("logged")).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    let entries = line.as_array().unwrap();
    assert_eq!(entries[0], serde_json::json!(4));
    assert_eq!(entries[1]["name"], serde_json::json!("logged"));
}
