//! Terminal host: drives a [`SessionBootstrap`] and prints its surfaces.

use std::io::{self, Write};
use std::time::Duration;

use scribe_collab::{RoomBackend, SharedTextEditor};
use scribe_session::{ScopeStatus, SessionBootstrap, SessionScope, Surface};

/// Re-render at least this often so remote edits show up.
const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

pub type Bootstrap = SessionBootstrap<RoomBackend, SharedTextEditor>;

pub struct Host<W: Write> {
    bootstrap: Bootstrap,
    /// Text appended to the document once the room is connected.
    append: Option<String>,
    last: Option<Surface>,
    out: W,
}

impl<W: Write> Host<W> {
    pub fn new(bootstrap: Bootstrap, append: Option<String>, out: W) -> Self {
        Self {
            bootstrap,
            append,
            last: None,
            out,
        }
    }

    /// Render once, printing the surface if it differs from the last one.
    pub fn present(&mut self) -> io::Result<Surface> {
        let surface = self.bootstrap.render();
        if self.last.as_ref() != Some(&surface) {
            writeln!(self.out, "{surface}")?;
            self.out.flush()?;
            self.last = Some(surface.clone());
        }
        Ok(surface)
    }

    /// Run until Ctrl-C or an error surface. Returns the last surface.
    pub async fn run(&mut self) -> io::Result<Surface> {
        self.present()?;
        let context = self.bootstrap.mount();
        log::info!(
            "Mounted session for {} in room {}",
            context.identity.display_name(),
            context.room
        );

        let surface = self.present()?;
        if surface.is_error() {
            return Ok(surface);
        }
        let Some(mut readiness) = self.bootstrap.readiness() else {
            return Ok(surface);
        };

        let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                changed = readiness.changed() => {
                    if changed.is_err() {
                        log::warn!("Session scope closed");
                        return self.present();
                    }
                }
                _ = refresh.tick() => {}
                _ = &mut ctrl_c => {
                    log::info!("Interrupted, leaving room");
                    return self.present();
                }
            }

            self.append_pending();
            let surface = self.present()?;
            if surface.is_error() {
                return Ok(surface);
            }
        }
    }

    fn append_pending(&mut self) {
        let Some(scope) = self.bootstrap.scope() else {
            return;
        };
        if scope.status() != ScopeStatus::Connected {
            return;
        }
        if let Some(text) = self.append.take() {
            match scope.edit_text(&text) {
                Ok(()) => log::info!("Appended {} bytes to room {}", text.len(), scope.room_id()),
                Err(e) => log::warn!("Failed to append to room {}: {e}", scope.room_id()),
            }
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }
}
