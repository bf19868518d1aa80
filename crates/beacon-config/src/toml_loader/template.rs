//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r#"# Beacon Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[ipc]
# port = 19542                # port the desktop app listens on (127.0.0.1)
# connect_timeout_secs = 5    # 1-60

[retry]
# max_attempts = 0            # 0 = retry until the desktop app is up
# delay_secs = 5              # 1-3600
# backoff = "fixed"           # "fixed" or "exponential"
# max_delay_secs = 60         # cap for exponential backoff

[presence]
# source = "stdin"            # line-delimited JSON presence updates
# channel_capacity = 64       # 1-4096

[logging]
# level = "info"              # trace, debug, info, warn, error
"#
}
