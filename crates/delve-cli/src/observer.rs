use console::style;
use delve::scanner::DisplaySegment;
use delve::turn::TurnObserver;
use std::io::{self, Write};

/// Streams turns to stdout as they arrive, reasoning in italic green
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ConsoleObserver {
    pub fn format(segment: &DisplaySegment) -> String {
        if segment.annotated {
            style(&segment.text).italic().green().to_string()
        } else {
            segment.text.clone()
        }
    }
}

impl TurnObserver for ConsoleObserver {
    fn on_segment(&self, segment: &DisplaySegment) {
        let mut stdout = io::stdout().lock();
        // a closed stdout must not stop the session
        let _ = write!(stdout, "{}", Self::format(segment));
        let _ = stdout.flush();
    }

    fn on_turn_end(&self) {
        println!();
    }
}
