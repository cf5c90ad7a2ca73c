/// Per-session trace toggles for the lifecycle passes.
///
/// Each enabled flag makes the matching pass emit one `debug` record per node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceConfig {
    pub style: bool,
    pub layout: bool,
    pub render: bool,
    pub events: bool,
}

impl TraceConfig {
    pub const fn off() -> Self {
        Self {
            style: false,
            layout: false,
            render: false,
            events: false,
        }
    }

    pub const fn all() -> Self {
        Self {
            style: true,
            layout: true,
            render: true,
            events: true,
        }
    }

    /// A toggle is on when its `TRELLIS_TRACE_*` variable is present.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var_os(name).is_some())
    }

    fn from_lookup(present: impl Fn(&str) -> bool) -> Self {
        Self {
            style: present("TRELLIS_TRACE_STYLE"),
            layout: present("TRELLIS_TRACE_LAYOUT"),
            render: present("TRELLIS_TRACE_RENDER"),
            events: present("TRELLIS_TRACE_EVENTS"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeConfig {
    pub trace: TraceConfig,
    /// Recompute every cached type default on each lookup and ignore part defaults.
    pub rebuild_default_styles: bool,
}

impl TreeConfig {
    pub fn from_env() -> Self {
        Self {
            trace: TraceConfig::from_env(),
            rebuild_default_styles: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TraceConfig;

    #[test]
    fn toggles_follow_present_variables() {
        let on = ["TRELLIS_TRACE_LAYOUT", "TRELLIS_TRACE_EVENTS"];
        let trace = TraceConfig::from_lookup(|name| on.contains(&name));
        assert_eq!(
            trace,
            TraceConfig {
                layout: true,
                events: true,
                ..TraceConfig::off()
            }
        );
        assert_eq!(TraceConfig::from_lookup(|_| true), TraceConfig::all());
        assert_eq!(TraceConfig::from_lookup(|_| false), TraceConfig::default());
    }
}
