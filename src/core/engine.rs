use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::core::network::NetworkEvent;
use crate::core::session::Session;

/// Heartbeat for the timer, delayed game steps and input polling.
const TICK_RATE: Duration = Duration::from_millis(50);

pub struct Engine {
    session: Session,
    events: Option<UnboundedReceiver<NetworkEvent>>,
}

impl Engine {
    pub fn new(session: Session, events: Option<UnboundedReceiver<NetworkEvent>>) -> Self {
        Self { session, events }
    }

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        let mut ticker = time::interval(TICK_RATE);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.session.start(Instant::now());

        loop {
            terminal.draw(|f| self.session.render(f))?;

            // INPUT (Non-blocking)
            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.session.handle_key(key, Instant::now());
                    }
                }
            }
            if self.session.should_quit() {
                info!("quit requested");
                break;
            }

            tokio::select! {
                // RECEIVE: a message or a hang-up from the other player
                event = next_event(&mut self.events) => match event {
                    NetworkEvent::Message(msg) => self.session.handle_peer_message(msg, Instant::now()),
                    NetworkEvent::Disconnected => {
                        self.events = None;
                        self.session.on_disconnect(Instant::now());
                    }
                },

                // TICK: timer seconds, delayed game steps, notice expiry
                _ = ticker.tick() => self.session.tick(Instant::now()),
            }
        }

        Ok(())
    }
}

/// Never resolves in solo mode or once the peer is gone.
async fn next_event(events: &mut Option<UnboundedReceiver<NetworkEvent>>) -> NetworkEvent {
    match events {
        Some(rx) => rx.recv().await.unwrap_or(NetworkEvent::Disconnected),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn closed_channel_reads_as_disconnect() {
        let (tx, rx) = mpsc::unbounded_channel::<NetworkEvent>();
        drop(tx);
        let mut events = Some(rx);
        assert_eq!(next_event(&mut events).await, NetworkEvent::Disconnected);
    }

    #[tokio::test]
    async fn solo_mode_never_yields_events() {
        let mut events = None;
        let waited = time::timeout(Duration::from_millis(20), next_event(&mut events)).await;
        assert!(waited.is_err());
    }
}
