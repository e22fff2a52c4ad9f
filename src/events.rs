use crossterm::event::{Event, KeyEvent, KeyEventKind};
use std::time::Duration;

/// Terminal input the main loop reacts to. Key releases and repeats are
/// dropped here so handlers only ever see presses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Waits up to one tick for input.
    pub fn next(&self) -> anyhow::Result<AppEvent> {
        if !crossterm::event::poll(self.tick_rate)? {
            return Ok(AppEvent::Tick);
        }
        Ok(classify(crossterm::event::read()?))
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

fn classify(event: Event) -> AppEvent {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
        Event::Resize(_, _) => AppEvent::Resize,
        _ => AppEvent::Tick,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    #[test]
    fn only_presses_reach_handlers() {
        let press = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(classify(Event::Key(press)), AppEvent::Key(press));

        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..press
        };
        assert_eq!(classify(Event::Key(release)), AppEvent::Tick);
        assert_eq!(classify(Event::Resize(80, 24)), AppEvent::Resize);
    }
}
