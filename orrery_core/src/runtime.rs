//! Cooperative event loop driving an [`Orrery`] controller.
//!
//! One task interleaves transport events, user commands, an outstanding
//! batch request and the render clock's scheduling yield. Every wakeup is
//! followed by a `tick`, so the reconnect deadline and frame pacing are
//! checked at least once per poll interval, even while a batch request is
//! slow to answer.

use orrery_env::{OrreryContext, SnapshotTransport, StreamReceiver};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::controller::{Command, ControllerStats, Flow, Orrery};
use crate::render::{RenderError, Renderer};

type PendingFetch<'a> = Pin<Box<dyn Future<Output = Command> + Send + 'a>>;

fn start_fetch<T: SnapshotTransport>(transport: &T, requested: usize) -> PendingFetch<'_> {
    debug!("fetching {} snapshots", requested);
    Box::pin(async move {
        let result = transport.fetch(requested).await;
        Command::Batch { requested, result }
    })
}

/// Runs until the command channel closes or `Shutdown` arrives.
///
/// The controller is disposed on every exit path.
pub async fn run<C, T, R>(
    orrery: &mut Orrery<C, T>,
    mut events: StreamReceiver,
    mut commands: mpsc::UnboundedReceiver<Command>,
    renderer: &mut R,
) -> Result<ControllerStats, RenderError>
where
    C: OrreryContext,
    T: SnapshotTransport,
    R: Renderer + ?Sized,
{
    let ctx = orrery.context().clone();
    let transport = orrery.transport().clone();
    let poll_interval = orrery.config().clock.poll_interval;
    let mut pending: Option<PendingFetch<'_>> = None;

    loop {
        if pending.is_none() {
            if let Some(requested) = orrery.take_fetch() {
                pending = Some(start_fetch(transport.as_ref(), requested));
            }
        }

        let flow = tokio::select! {
            Some((handle, event)) = events.recv() => {
                orrery.update(Command::Stream { handle, event })
            }
            command = commands.recv() => match command {
                Some(command) => orrery.update(command),
                None => Flow::Exit,
            },
            batch = async {
                match pending.as_mut() {
                    Some(fetch) => fetch.await,
                    None => std::future::pending().await,
                }
            }, if pending.is_some() => {
                pending = None;
                orrery.update(batch)
            }
            _ = ctx.sleep(poll_interval) => Flow::Continue,
        };

        if flow == Flow::Exit {
            break;
        }

        if let Some(scene) = orrery.tick() {
            if let Err(e) = renderer.draw(&scene) {
                orrery.dispose();
                return Err(e);
            }
        }
    }

    orrery.dispose();
    let stats = orrery.stats();
    info!(
        "Playback loop finished: {} frames, {} admitted, {} dropped",
        stats.frames,
        stats.admitted,
        stats.malformed + stats.rejected
    );
    Ok(stats)
}
