use std::path::Path;

use crate::config::Config;

/// Config for tests against a local `httpmock::MockServer`: no shaping, no
/// environment proxy, short timeouts.
pub fn test_config(output_dir: &Path) -> Config {
    Config {
        output_dir: output_dir.to_string_lossy().to_string(),
        shaping: false,
        system_proxy: false,
        request_timeout_secs: 10,
        connect_timeout_secs: 5,
        ..Config::default()
    }
}
