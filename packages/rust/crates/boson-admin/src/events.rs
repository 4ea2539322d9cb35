//! Event ids for the console's own `tracing` calls.

/// Structured log event emitted by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleEvent {
    /// Backend URL and session file chosen.
    Configured,
    /// A settings file exists but could not be read.
    SettingsReadFailed,
    /// A settings file is not valid YAML for the settings schema.
    SettingsParseFailed,
    /// A second `--conf` value differed from the first and was dropped.
    ConfigHomeOverrideIgnored,
}

impl ConsoleEvent {
    /// Every event, for registry checks.
    pub const ALL: [Self; 4] = [
        Self::Configured,
        Self::SettingsReadFailed,
        Self::SettingsParseFailed,
        Self::ConfigHomeOverrideIgnored,
    ];

    /// Dotted event id.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configured => "console.configured",
            Self::SettingsReadFailed => "console.settings.read_failed",
            Self::SettingsParseFailed => "console.settings.parse_failed",
            Self::ConfigHomeOverrideIgnored => "console.settings.config_home_ignored",
        }
    }
}
