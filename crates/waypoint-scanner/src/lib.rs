/// The in-page agent: perception capture, probes, gestures and element actions.
/// Browser surfaces inject this string and talk to `window.Waypoint.process`.
pub const SCANNER_JS: &str = include_str!("scanner.js");

/// Expression that is `true` once the agent is installed in the page.
pub const INSTALLED_CHECK: &str = "typeof window.Waypoint !== 'undefined'";
