//! Host REPL integration.
//!
//! A [`Session`] owns the enable/disable lifecycle around a [`Viewer`].
//! The host keeps one session for its process, points its output hook at
//! [`Session::display`], and calls it with every evaluated value. The
//! session never installs itself anywhere; wiring the hook up is the
//! host's job.
//!
//! # Display Tiers
//!
//! [`Session::display`] tries three things in order:
//!
//! 1. render the value through the viewer's resolved rule;
//! 2. if nothing matched, page the value's raw inspect text when it
//!    overflows the screen;
//! 3. otherwise report [`DisplayOutcome::Unhandled`] so the host prints
//!    the value the way it always did.
//!
//! Errors never escape `display`: a failing formatter or pager is
//! reported on stderr and the value falls through to the next tier. The
//! host's evaluation loop must keep running no matter what a formatter
//! does.

use vantage_pager::PageMode;

use crate::error::ViewError;
use crate::value::ReplValue;
use crate::viewer::{Viewer, ViewerBuilder};

/// What [`Session::enable`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    /// A viewer was built and is now live.
    Enabled,
    /// A viewer was already live; nothing changed.
    AlreadyEnabled,
}

/// What [`Session::display`] did with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// A rule matched; the rendered text went to the sink.
    Rendered,
    /// No rule matched; the raw inspect text was paged.
    Paged,
    /// Nothing applied; the host should print its default representation.
    Unhandled,
}

impl DisplayOutcome {
    /// True unless the host still needs to print the value itself.
    pub fn is_handled(&self) -> bool {
        !matches!(self, DisplayOutcome::Unhandled)
    }
}

/// The enable/disable lifecycle around a viewer.
///
/// The builder given at construction is the blueprint: every enable
/// builds a fresh viewer from it, so a disable/enable cycle restores the
/// blueprint state and drops any runtime mutations made on the previous
/// viewer.
#[derive(Debug)]
pub struct Session {
    blueprint: ViewerBuilder,
    viewer: Option<Viewer>,
}

impl Session {
    /// Creates a disabled session around a blueprint.
    pub fn new(blueprint: ViewerBuilder) -> Self {
        Self {
            blueprint,
            viewer: None,
        }
    }

    /// True while a viewer is live.
    pub fn is_enabled(&self) -> bool {
        self.viewer.is_some()
    }

    /// Build and install the viewer.
    ///
    /// Idempotent: enabling an enabled session reports
    /// [`EnableOutcome::AlreadyEnabled`] and leaves the live viewer
    /// untouched.
    pub fn enable(&mut self) -> Result<EnableOutcome, ViewError> {
        if self.viewer.is_some() {
            return Ok(EnableOutcome::AlreadyEnabled);
        }
        self.viewer = Some(self.blueprint.clone().build()?);
        Ok(EnableOutcome::Enabled)
    }

    /// Tear down the viewer.
    ///
    /// Returns whether there was one to tear down.
    pub fn disable(&mut self) -> bool {
        self.viewer.take().is_some()
    }

    /// The live viewer, when enabled.
    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    /// Mutable access to the live viewer, for runtime registration.
    pub fn viewer_mut(&mut self) -> Option<&mut Viewer> {
        self.viewer.as_mut()
    }

    /// The output hook: hand a just-evaluated value to the pipeline.
    ///
    /// Never fails and never panics the host loop; see the module docs
    /// for the tier order.
    pub fn display(&self, value: &ReplValue) -> DisplayOutcome {
        let viewer = match &self.viewer {
            Some(viewer) => viewer,
            None => return DisplayOutcome::Unhandled,
        };

        match viewer.render(value) {
            Ok(true) => return DisplayOutcome::Rendered,
            Ok(false) => {}
            Err(err) => eprintln!("vantage: render failed: {err}"),
        }

        let raw = value.inspect();
        if viewer.config().pager && viewer.pager().activated_by(&raw, PageMode::Inspect) {
            match viewer.pager().page(&raw, PageMode::Inspect) {
                Ok(()) => return DisplayOutcome::Paged,
                Err(err) => eprintln!("vantage: pager failed: {err}"),
            }
        }

        DisplayOutcome::Unhandled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSpec;
    use crate::formatter::Options;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use vantage_pager::{MockPagerRunner, Pager};

    fn value(tag: &str) -> ReplValue {
        ReplValue::new(tag, json!("payload"))
    }

    fn capture() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) + 'static) {
        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let writer = Rc::clone(&seen);
        (seen, move |text: &str| {
            writer.borrow_mut().push(text.to_string())
        })
    }

    fn blueprint() -> ViewerBuilder {
        Viewer::builder()
            .config(json!({"width": 80, "height": 24}))
            .helper("plain", |value: &ReplValue, _: &Options| {
                Ok(value.data().as_str().unwrap_or_default().to_string())
            })
    }

    #[test]
    fn enable_is_idempotent() {
        let mut session = Session::new(blueprint());
        assert!(!session.is_enabled());

        assert_eq!(session.enable().unwrap(), EnableOutcome::Enabled);
        assert!(session.is_enabled());
        assert_eq!(session.enable().unwrap(), EnableOutcome::AlreadyEnabled);
        assert!(session.is_enabled());
    }

    #[test]
    fn disable_reports_whether_enabled() {
        let mut session = Session::new(blueprint());
        session.enable().unwrap();

        assert!(session.disable());
        assert!(!session.disable());
        assert!(!session.is_enabled());
    }

    #[test]
    fn reenable_restores_blueprint_state() {
        let mut session = Session::new(blueprint().rule("Text", RuleSpec::method("plain")));
        session.enable().unwrap();

        session
            .viewer_mut()
            .unwrap()
            .add_rule("Extra", RuleSpec::method("plain"))
            .unwrap();
        assert!(session.viewer().unwrap().config().output.contains_key("Extra"));

        session.disable();
        session.enable().unwrap();

        let config = session.viewer().unwrap().config();
        assert!(config.output.contains_key("Text"));
        assert!(!config.output.contains_key("Extra"));
    }

    #[test]
    fn display_unhandled_while_disabled() {
        let session = Session::new(blueprint());
        assert_eq!(session.display(&value("Text")), DisplayOutcome::Unhandled);
    }

    #[test]
    fn display_renders_matching_value() {
        let (seen, sink) = capture();
        let mut session =
            Session::new(blueprint().rule("Text", RuleSpec::method("plain")).sink(sink));
        session.enable().unwrap();

        let outcome = session.display(&value("Text"));

        assert_eq!(outcome, DisplayOutcome::Rendered);
        assert!(outcome.is_handled());
        assert_eq!(seen.borrow().as_slice(), ["payload".to_string()]);
    }

    #[test]
    fn display_pages_long_unmatched_inspect() {
        let runner = MockPagerRunner::available();
        let log = runner.log();
        let mut session = Session::new(
            Viewer::builder()
                .config(json!({"width": 2, "height": 2}))
                .pager(Pager::with_runner(runner, 0, 0)),
        );
        session.enable().unwrap();

        let long = ReplValue::new("Mystery", json!(null)).with_inspect("well past four chars");
        let outcome = session.display(&long);

        assert_eq!(outcome, DisplayOutcome::Paged);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text, "well past four chars");
    }

    #[test]
    fn display_leaves_short_unmatched_values_to_host() {
        let runner = MockPagerRunner::available();
        let log = runner.log();
        let mut session = Session::new(
            Viewer::builder()
                .config(json!({"width": 80, "height": 24}))
                .pager(Pager::with_runner(runner, 0, 0)),
        );
        session.enable().unwrap();

        let short = ReplValue::new("Mystery", json!(null)).with_inspect("tiny");
        let outcome = session.display(&short);

        assert_eq!(outcome, DisplayOutcome::Unhandled);
        assert!(!outcome.is_handled());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn display_skips_paging_when_pager_disabled() {
        let runner = MockPagerRunner::available();
        let log = runner.log();
        let mut session = Session::new(
            Viewer::builder()
                .config(json!({"width": 2, "height": 2, "pager": false}))
                .pager(Pager::with_runner(runner, 0, 0)),
        );
        session.enable().unwrap();

        let long = ReplValue::new("Mystery", json!(null)).with_inspect("well past four chars");
        assert_eq!(session.display(&long), DisplayOutcome::Unhandled);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn display_absorbs_render_errors() {
        let (seen, sink) = capture();
        let mut session = Session::new(
            blueprint()
                .helper("broken", |_: &ReplValue, _: &Options| {
                    Err(anyhow::anyhow!("cannot format"))
                })
                .rule("Text", RuleSpec::method("broken"))
                .sink(sink),
        );
        session.enable().unwrap();

        let outcome = session.display(&value("Text").with_inspect("tiny"));

        assert_eq!(outcome, DisplayOutcome::Unhandled);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn display_absorbs_pager_failure() {
        let runner = MockPagerRunner::failure("exec failed");
        let mut session = Session::new(
            Viewer::builder()
                .config(json!({"width": 2, "height": 2}))
                .pager(Pager::with_runner(runner, 0, 0)),
        );
        session.enable().unwrap();

        let long = ReplValue::new("Mystery", json!(null)).with_inspect("well past four chars");
        assert_eq!(session.display(&long), DisplayOutcome::Unhandled);
    }
}
