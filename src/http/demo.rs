//! `/demo` page for the frontend.
//!
//! `GET /demo?bomb=1` is the only way to switch the persistent bomb on.

use axum::{extract::State, http::Uri, response::Html};

use crate::http::request::bomb_flag;
use crate::http::server::AppState;
use crate::labels::LabelTier;
use crate::state::{CardinalityState, ServiceMode};

pub async fn demo_page(State(state): State<AppState>, uri: Uri) -> Html<String> {
    let bomb_requested = bomb_flag(uri.query());
    if bomb_requested {
        state.service.mode().activate_bomb();
    }

    let service = &state.service;
    let flags = service.mode().snapshot();
    let tier = service.policy().tier(flags, bomb_requested);
    let requests = service.gold().map_or(0, |gold| gold.counters().requests());

    Html(render(&PageContext {
        mode: service.mode().mode(),
        flags,
        tier,
        requests,
        api_url: state.upstream.as_ref().map_or("", |u| u.url()),
        collector: &state.collector_endpoint,
    }))
}

struct PageContext<'a> {
    mode: ServiceMode,
    flags: CardinalityState,
    tier: LabelTier,
    requests: u64,
    api_url: &'a str,
    collector: &'a str,
}

fn render(ctx: &PageContext<'_>) -> String {
    let (banner_class, banner_title) = match ctx.tier {
        LabelTier::Bomb => ("bomb", "CARDINALITY BOMB".to_string()),
        _ => (ctx.mode.as_str(), ctx.mode.as_str().to_uppercase()),
    };
    let high = if ctx.flags.high_cardinality_enabled { "ON" } else { "OFF" };

    let (labels_title, labels_body) = match ctx.tier {
        LabelTier::Bomb => (
            "Bomb",
            "<p><strong>Bomb labels:</strong> user_id, path (full), path_id, pod, instance, container, build_id</p>\
             <p>Every request gets a unique user_id and path_id combination.</p>",
        ),
        LabelTier::Firehose => (
            "High Cardinality",
            "<p><strong>High-cardinality labels:</strong> user_id, path (full), pod, instance, container, build_id</p>\
             <p>These labels create thousands of time series.</p>",
        ),
        LabelTier::Shaped => (
            "Shaped",
            "<p><strong>Shaped labels:</strong> path (normalized, e.g. /orders/{id})</p>",
        ),
    };

    let bomb_warning = if ctx.tier == LabelTier::Bomb {
        r#"<div class="bomb-warning"><strong>CARDINALITY BOMB ACTIVE</strong>
    <p>Every request now carries <code>user_id</code> and <code>path_id</code> labels. Only a restart clears this.</p></div>"#
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Cardinality Demo - Frontend</title>
  <style>{STYLE}</style>
</head>
<body>
  <h1>Cardinality Demo - Frontend Service</h1>
  <div class="mode {banner_class}">
    <h2>Current Mode: {banner_title}</h2>
    <p>High Cardinality Mode: <strong>{high}</strong></p>
  </div>
  {bomb_warning}
  <div class="info">
    <h3>Metrics Emitted</h3>
    <ul>
      <li><code>http_request_duration_seconds</code> - request latency histogram</li>
      <li><code>http_request_total</code> - request counter</li>
      <li><code>http_error_total</code> - error counter</li>
    </ul>
  </div>
  <div class="gold-metrics">
    <h3>Gold Metrics</h3>
    <div class="metrics-grid">
      <div class="metric-card"><div class="metric-label">Request Rate</div><div class="metric-value" id="request-rate">-</div>req/sec</div>
      <div class="metric-card"><div class="metric-label">Error Rate</div><div class="metric-value" id="error-rate">-</div>%</div>
      <div class="metric-card"><div class="metric-label">P95 Latency</div><div class="metric-value" id="p95-latency">-</div>ms</div>
      <div class="metric-card"><div class="metric-label">Saturation</div><div class="metric-value" id="saturation">-</div>%</div>
    </div>
  </div>
  <div class="info">
    <h3>Labels ({labels_title})</h3>
    <p><strong>Always present:</strong> service, method, route, status_code</p>
    {labels_body}
  </div>
  <div>
    <h3>Actions</h3>
    <button onclick="toggleCardinality()">Toggle High Cardinality Mode</button>
    <button onclick="activateBomb()" class="danger">Activate Cardinality Bomb</button>
    <button onclick="generateTraffic()">Generate Sample Traffic</button>
    <button onclick="location.reload()">Refresh</button>
  </div>
  <div class="info">
    <h3>Service Status</h3>
    <p>Total Requests: <strong>{requests}</strong></p>
    <p>API URL: <code>{api_url}</code></p>
    <p>OTel Collector: <code>{collector}</code></p>
  </div>
  <script>{SCRIPT}</script>
</body>
</html>
"#,
        requests = ctx.requests,
        api_url = escape(ctx.api_url),
        collector = escape(ctx.collector),
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; max-width: 1000px; margin: 50px auto; padding: 20px; }
    .mode { padding: 10px; margin: 10px 0; border-radius: 5px; }
    .firehose { background-color: #ffebee; border-left: 4px solid #f44336; }
    .shaped { background-color: #e8f5e9; border-left: 4px solid #4caf50; }
    .bomb { background-color: #fff3e0; border-left: 4px solid #ff9800; }
    button { padding: 10px 20px; margin: 5px; cursor: pointer; font-size: 16px; }
    button.danger { background: #ff9800; color: white; border: none; }
    .info { background: #f5f5f5; padding: 15px; border-radius: 5px; margin: 10px 0; }
    .gold-metrics { background: #5a67d8; color: white; padding: 20px; border-radius: 8px; margin: 20px 0; }
    .metrics-grid { display: grid; grid-template-columns: repeat(2, 1fr); gap: 15px; }
    .metric-card { background: rgba(255, 255, 255, 0.2); padding: 15px; border-radius: 5px; }
    .metric-value { font-size: 32px; font-weight: bold; margin: 10px 0; }
    .metric-label { font-size: 14px; text-transform: uppercase; letter-spacing: 1px; }
    code { background: #e0e0e0; padding: 2px 6px; border-radius: 3px; color: black; }
    .bomb-warning { background: #ffebee; border: 2px solid #f44336; padding: 15px; border-radius: 5px; margin: 10px 0; }
"#;

const SCRIPT: &str = r#"
    async function toggleCardinality() {
      await fetch('/toggle-cardinality', { method: 'POST' });
      location.reload();
    }

    function activateBomb() {
      window.location.href = window.location.pathname + '?bomb=1';
    }

    async function generateTraffic() {
      for (let i = 0; i < 10; i++) {
        fetch('/api/call');
        await new Promise(r => setTimeout(r, 100));
      }
      alert('Generated 10 requests!');
    }

    async function updateGoldMetrics() {
      try {
        const data = await (await fetch('/gold-metrics')).json();
        document.getElementById('request-rate').textContent = data.request_rate;
        document.getElementById('error-rate').textContent = data.error_rate;
        document.getElementById('p95-latency').textContent = data.p95_latency_ms;
        document.getElementById('saturation').textContent = data.saturation;
      } catch (error) {
        console.error('Failed to fetch gold metrics:', error);
      }
    }

    updateGoldMetrics();
    setInterval(updateGoldMetrics, 2000);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn context(tier: LabelTier) -> PageContext<'static> {
        PageContext {
            mode: ServiceMode::Shaped,
            flags: CardinalityState::default(),
            tier,
            requests: 7,
            api_url: "http://api:8080/process",
            collector: "http://collector:4318",
        }
    }

    #[test]
    fn test_shaped_page() {
        let page = render(&context(LabelTier::Shaped));
        assert!(page.contains("Current Mode: SHAPED"));
        assert!(page.contains("/orders/{id}"));
        assert!(page.contains("Total Requests: <strong>7</strong>"));
        assert!(!page.contains("CARDINALITY BOMB ACTIVE"));
    }

    #[test]
    fn test_bomb_page() {
        let page = render(&context(LabelTier::Bomb));
        assert!(page.contains("Current Mode: CARDINALITY BOMB"));
        assert!(page.contains("CARDINALITY BOMB ACTIVE"));
        assert!(page.contains("path_id"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
