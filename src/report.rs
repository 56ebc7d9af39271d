//! Warning sinks injected into the engines.
//!
//! Engines report recoverable conditions (such as an unmatched key in
//! tolerant mode) through a [`WarningSink`] passed by the caller instead of
//! writing to a process-wide logger.

/// Receives warnings raised while an engine runs.
pub trait WarningSink {
    fn warn(&self, message: &str);
}

/// Forwards warnings to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl WarningSink for LogSink {
    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }
}

/// Discards every warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl WarningSink for Silent {
    fn warn(&self, _message: &str) {}
}

impl<F> WarningSink for F
where
    F: Fn(&str),
{
    fn warn(&self, message: &str) {
        self(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closure_sink_collects() {
        let seen = RefCell::new(Vec::new());
        let sink = |m: &str| seen.borrow_mut().push(m.to_string());
        sink.warn("first");
        sink.warn("second");
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_silent_sink() {
        Silent.warn("ignored");
    }
}
