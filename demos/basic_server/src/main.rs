//! Demo scene server: a colored cube and a method that recolors it.
//!
//! Connect any NOODLES client to `ws://localhost:50000`, invoke `set_color`
//! with `[r, g, b]` floats, and watch the material update arrive on every
//! connection.

use std::path::PathBuf;

use ciborium::Value;
use clap::Parser;
use tracing::info;

use fusilli_geometry::{GeometryPatchInput, build_entity, build_geometry_patch, create_instances};
use fusilli_server::{MethodException, Scene, Server, ServerConfig};
use fusilli_types::{Geometry, Material, Method, MethodArg, Signal};

#[derive(Parser)]
#[command(name = "basic_server", about = "Demo NOODLES scene server")]
struct Args {
    /// Socket address to listen on
    #[arg(short, long, default_value = "0.0.0.0:50000")]
    bind: String,

    /// Optional JSON-lines log of outbound messages
    #[arg(short, long)]
    message_log: Option<PathBuf>,
}

const CUBE_VERTICES: [[f32; 3]; 8] = [
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5],
];

const CUBE_TRIANGLES: [[u32; 3]; 12] = [
    [0, 1, 3],
    [0, 3, 2],
    [1, 5, 7],
    [1, 7, 3],
    [5, 4, 6],
    [5, 6, 7],
    [4, 0, 2],
    [4, 2, 6],
    [2, 3, 7],
    [2, 7, 6],
    [4, 5, 1],
    [4, 1, 0],
];

fn as_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Float(float) => Some(*float as f32),
        Value::Integer(integer) => Some(i128::from(*integer) as f32),
        _ => None,
    }
}

fn populate(scene: &mut Scene) -> anyhow::Result<()> {
    let material = scene.create(Material {
        name: Some("cube material".to_string()),
        ..Material::default()
    })?;
    scene.create(Signal::new("recolored"))?;

    let patch = build_geometry_patch(
        scene,
        Some("cube"),
        GeometryPatchInput::triangles(
            CUBE_VERTICES.to_vec(),
            CUBE_TRIANGLES.iter().map(|triangle| triangle.to_vec()).collect(),
            material,
        ),
        None,
        true,
    )?;
    let geometry = scene.create(Geometry {
        name: Some("cube".to_string()),
        ..Geometry::new(vec![patch])
    })?;
    let instances = create_instances(&[[0.0, 0.0, 0.0]], &[], &[], &[]);
    build_entity(scene, geometry, Some(&instances))?;

    scene.register_method(
        Method::new("set_color")
            .with_doc("Recolor the cube material")
            .with_args(vec![
                MethodArg::new("r"),
                MethodArg::new("g"),
                MethodArg::new("b"),
            ]),
        move |scene, _context, args| {
            let channels: Vec<f32> = args.iter().filter_map(as_f32).collect();
            let [r, g, b] = channels.as_slice() else {
                return Err(MethodException::invalid_params().into());
            };
            let material_state = scene
                .get_mut::<Material>(material)
                .map_err(anyhow::Error::from)?;
            material_state.pbr_info.base_color = [*r, *g, *b, 1.0];
            scene.update(material).map_err(anyhow::Error::from)?;
            Ok(Value::Null)
        },
    )?;

    info!("scene populated");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::new().with_bind(args.bind);
    if let Some(path) = args.message_log {
        config = config.with_message_log(path);
    }

    let server = Server::new(config)?;
    populate(&mut server.scene())?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            shutdown.shutdown();
        }
    });

    server.run().await?;
    Ok(())
}
