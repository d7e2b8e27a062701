//! Session configuration.

/// Configuration for a [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum firings per `fire_all_rules` call. `None` means unbounded.
    pub max_firings: Option<usize>,
    /// Whether updates that touch no watched field may skip re-propagation.
    pub property_reactive: bool,
    /// Whether consequence output is kept for [`Session::output`](crate::Session::output).
    /// Output is always logged at debug level.
    pub capture_output: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_firings: None,
            property_reactive: true,
            capture_output: true,
        }
    }
}

impl SessionConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to cap firings per `fire_all_rules` call.
    #[must_use]
    pub const fn with_max_firings(mut self, limit: usize) -> Self {
        self.max_firings = Some(limit);
        self
    }

    /// Builder method to remove the firing cap.
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.max_firings = None;
        self
    }

    /// Builder method to enable/disable property reactivity.
    #[must_use]
    pub const fn with_property_reactive(mut self, enabled: bool) -> Self {
        self.property_reactive = enabled;
        self
    }

    /// Builder method to enable/disable output capture.
    #[must_use]
    pub const fn with_capture_output(mut self, enabled: bool) -> Self {
        self.capture_output = enabled;
        self
    }
}
