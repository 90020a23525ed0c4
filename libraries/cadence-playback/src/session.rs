//! Playback session lifecycle
//!
//! `Session::start` wires one engine instance together and spawns its tasks:
//!
//! - the command loop, which owns the controller and feeds it external
//!   commands, loopback messages, backend events and progress ticks one at a
//!   time
//! - the persister, which writes queue, bookmark and mode saves in order
//! - the notification coalescer
//!
//! `Session::stop` ends all three and releases every resource. Dropping the
//! session without stopping it closes the command channel, which winds the
//! tasks down the same way.

use crate::config::PlaybackConfig;
use crate::controller::{Collaborators, Command, Message, PlaybackController};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::notification::NotificationCoalescer;
use crate::persister::Persister;
use crate::player::{AudioPlayer, BackendEvent, DualPlayer, EventSink};
use cadence_core::NotificationRenderer;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cloneable sender of external commands
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandSender {
    /// Queue a command; fails once the session has ended
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| PlaybackError::SessionClosed)
    }
}

/// A running playback engine
pub struct Session {
    commands: CommandSender,
    events: broadcast::Sender<PlaybackEvent>,
    persister: Persister,
    cancel: CancellationToken,
    command_loop: JoinHandle<()>,
    persister_task: JoinHandle<()>,
    coalescer_task: JoinHandle<()>,
}

impl Session {
    /// Build the engine and spawn its tasks
    ///
    /// `make_players` receives one event sink per slot and returns the two
    /// backends in slot order. The saved queue is restored before the first
    /// command is handled.
    pub fn start<F>(
        config: PlaybackConfig,
        make_players: F,
        collaborators: Collaborators,
        renderer: Box<dyn NotificationRenderer>,
    ) -> Self
    where
        F: FnOnce([EventSink; 2]) -> [Box<dyn AudioPlayer>; 2],
    {
        let cancel = CancellationToken::new();

        let (backend_tx, backend_rx) = mpsc::unbounded_channel();
        let players = make_players(EventSink::pair(&backend_tx));
        let player = DualPlayer::new(players, config.crossfade.clone());

        let (persister, persister_task) = Persister::spawn(Arc::clone(&collaborators.persistence));

        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let coalescer = NotificationCoalescer::new(
            config.notification.clone(),
            renderer,
            Arc::clone(&collaborators.favorites),
        );
        let coalescer_task = coalescer.spawn(notify_rx, cancel.child_token());

        let (loopback_tx, loopback_rx) = mpsc::unbounded_channel();
        let tick = config.progress_interval();
        let mut controller = PlaybackController::new(
            config,
            player,
            collaborators,
            persister.clone(),
            loopback_tx,
        );
        controller.attach_notifications(notify_tx);
        let events = controller.event_sender();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let command_loop = tokio::spawn(run(
            controller,
            Channels {
                commands: command_rx,
                loopback: loopback_rx,
                backend: backend_rx,
            },
            tick,
            cancel.clone(),
        ));

        info!("Playback session started");
        Self {
            commands: CommandSender { tx: command_tx },
            events,
            persister,
            cancel,
            command_loop,
            persister_task,
            coalescer_task,
        }
    }

    /// Queue a command
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command)
    }

    /// Another handle for sending commands
    pub fn sender(&self) -> CommandSender {
        self.commands.clone()
    }

    /// Subscribe to playback events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Stop the engine
    ///
    /// Commands already queued are handled first. Then both players are
    /// released, pending saves are flushed and the notification is removed.
    pub async fn stop(self) {
        let Session {
            commands,
            events: _,
            persister,
            cancel,
            command_loop,
            persister_task,
            coalescer_task,
        } = self;
        drop(commands);

        cancel.cancel();
        if let Err(e) = command_loop.await {
            warn!("Command loop ended abnormally: {}", e);
        }

        persister.flush().await;
        drop(persister);
        if let Err(e) = persister_task.await {
            warn!("Persister ended abnormally: {}", e);
        }
        if let Err(e) = coalescer_task.await {
            warn!("Notification coalescer ended abnormally: {}", e);
        }
        info!("Playback session stopped");
    }
}

struct Channels {
    commands: mpsc::UnboundedReceiver<Command>,
    loopback: mpsc::UnboundedReceiver<Message>,
    backend: mpsc::UnboundedReceiver<BackendEvent>,
}

async fn run(
    mut controller: PlaybackController,
    mut channels: Channels,
    tick: std::time::Duration,
    cancel: CancellationToken,
) {
    controller.restore().await;

    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                while let Ok(command) = channels.commands.try_recv() {
                    controller.handle(Message::Command(command)).await;
                }
                break;
            }

            command = channels.commands.recv() => match command {
                Some(command) => controller.handle(Message::Command(command)).await,
                None => {
                    debug!("Every command sender dropped");
                    break;
                }
            },

            Some(message) = channels.loopback.recv() => controller.handle(message).await,

            Some(event) = channels.backend.recv() => {
                controller.handle(Message::Backend(event)).await;
            }

            _ = ticker.tick() => controller.handle(Message::Tick).await,
        }
    }

    controller.shutdown();
    // Dropping the controller closes the persister and coalescer inputs
    drop(controller);
    cancel.cancel();
}
