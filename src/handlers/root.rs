//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that displays
//! a landing page with all available endpoints and the polled registries.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    state.health_stats.record_http_request();

    let version = env!("CARGO_PKG_VERSION");

    // Calculate actual uptime from service start time
    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let mut target_rows = String::new();
    for target in state.supervisor.targets().await {
        let health = state.health_stats.target(&target.key()).unwrap_or_default();
        let status = if health.last_success.is_none() && !health.is_failing() {
            "pending"
        } else if health.is_failing() {
            "failing"
        } else {
            "ok"
        };
        writeln!(
            target_rows,
            "        <tr><td>{}</td><td><code>{}</code></td><td>{:?}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&target.name),
            escape_html(&target.endpoint),
            target.interval,
            health.instances,
            status
        )
        .ok();
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Eureka Exporter</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            line-height: 1.6;
        }}
        .container {{
            max-width: 900px;
            margin: 0 auto;
            background: white;
            padding: 40px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        h1 {{
            color: #333;
            border-bottom: 3px solid #007bff;
            padding-bottom: 15px;
        }}
        h2 {{ color: #555; margin-top: 35px; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ text-align: left; padding: 6px 10px; border-bottom: 1px solid #ddd; }}
        .endpoint-list {{ list-style: none; padding: 0; }}
        .endpoint-list li {{
            margin: 12px 0;
            padding: 12px;
            background: #f8f9fa;
            border-left: 4px solid #007bff;
            border-radius: 4px;
        }}
        .endpoint-list a {{ color: #007bff; text-decoration: none; font-weight: 600; }}
        .footer {{
            margin-top: 40px;
            padding-top: 20px;
            border-top: 1px solid #ddd;
            color: #666;
            font-size: 0.9em;
            text-align: center;
        }}
        code {{
            background: #e9ecef;
            padding: 2px 6px;
            border-radius: 3px;
            font-family: 'Courier New', monospace;
        }}
    </style>
</head>
<body>
<div class="container">
    <h1>Eureka Exporter</h1>
    <p>Version {version} - Uptime {uptime}</p>

    <h2>Registries</h2>
    <table>
        <tr><th>Name</th><th>Endpoint</th><th>Interval</th><th>Instances</th><th>Status</th></tr>
{targets}    </table>

    <h2>Available Endpoints</h2>
    <ul class="endpoint-list">
        <li><a href="/metrics">/metrics</a> - Prometheus-compatible metrics endpoint</li>
        <li><a href="/health">/health</a> - Exporter health and per-registry poll status (text)</li>
        <li><a href="/config">/config</a> - Active runtime configuration (read-only)</li>
    </ul>

    <div class="footer">
        <p>{footer}</p>
    </div>
</div>
</body>
</html>"#,
        version = version,
        uptime = uptime_str,
        targets = target_rows,
        footer = FOOTER_TEXT
    );

    Html(html)
}

/// Escapes text for use inside HTML element content and attributes.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("prod"), "prod");
        assert_eq!(
            escape_html("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
        assert_eq!(
            escape_html("http://eureka:8761/?a=1&b=\"2\""),
            "http://eureka:8761/?a=1&amp;b=&quot;2&quot;"
        );
    }
}
