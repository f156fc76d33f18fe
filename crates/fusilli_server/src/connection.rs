//! Per-client WebSocket connection handling.
//!
//! Each connection runs its own task: handshake (exactly one client intro),
//! introduction frame, then a steady receive loop that dispatches method
//! invocations. Outbound traffic goes through an unbounded per-client queue
//! drained by a writer task, so per-connection ordering follows queue order
//! and a slow client never blocks the scene.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fusilli_net::{ClientIntro, Frame, codec, tags};

use crate::scene::Scene;

/// Lock the scene, recovering from a poisoned mutex rather than panicking.
pub(crate) fn lock(scene: &Arc<Mutex<Scene>>) -> MutexGuard<'_, Scene> {
    scene.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) async fn handle_connection(
    scene: Arc<Mutex<Scene>>,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let websocket = match tokio_tungstenite::accept_async(stream).await {
        Ok(websocket) => websocket,
        Err(error) => {
            warn!(%peer, %error, "websocket handshake failed");
            return;
        }
    };
    let (mut sink, mut source) = websocket.split();

    // Handshake: exactly one client-intro message before anything else.
    let Some(client_name) = read_intro(&mut source).await else {
        warn!(%peer, "client closed before introduction");
        return;
    };
    info!(%peer, client = %client_name, "client connecting");

    let (sender, mut outbound) = mpsc::unbounded_channel::<Vec<u8>>();
    let client_id = match lock(&scene).attach_client(&client_name, sender) {
        Ok(id) => id,
        Err(error) => {
            warn!(%peer, %error, "failed to introduce client");
            return;
        }
    };

    let writer = tokio::spawn(async move {
        while let Some(bytes) = outbound.recv().await {
            if sink.send(Message::binary(bytes)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Binary(bytes)) => receive_frame(&scene, client_id, &bytes),
            Ok(Message::Close(_)) => break,
            Ok(_) => debug!(%peer, "ignoring non-binary message"),
            Err(error) => {
                debug!(%peer, %error, "connection error");
                break;
            }
        }
    }

    lock(&scene).detach_client(client_id);
    writer.abort();
    info!(%peer, client = %client_name, "client disconnected");
}

/// Handle one inbound logical message. Only invoke pairs are dispatched;
/// everything else is logged and ignored.
fn receive_frame(scene: &Arc<Mutex<Scene>>, client_id: Uuid, bytes: &[u8]) {
    let frame = match Frame::decode(bytes) {
        Ok(frame) => frame,
        Err(error) => {
            debug!(%error, "undecodable client frame");
            return;
        }
    };
    let mut scene = lock(scene);
    for (tag, content) in frame.pairs() {
        if *tag == tags::CLIENT_INVOKE {
            if let Err(error) = scene.dispatch_invoke(client_id, content) {
                warn!(%error, "failed to deliver method reply");
            }
        } else {
            debug!(tag, "ignoring unexpected client message");
        }
    }
}

async fn read_intro<S>(source: &mut S) -> Option<String>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Binary(bytes)) => {
                let frame = Frame::decode(&bytes).ok()?;
                let (tag, content) = frame.pairs().first()?;
                if *tag != tags::CLIENT_INTRO {
                    return None;
                }
                let intro: ClientIntro = codec::from_value(content).ok()?;
                return Some(intro.client_name);
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            // Pings and the like are handled by the protocol layer.
            Ok(_) => {}
        }
    }
    None
}
