use axum::response::Html;
use clickcore::ScoreView;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const STATE_PLACEHOLDER: &str = "{{INITIAL_STATE}}";

/// The Mini App page with `state` embedded as JSON.
pub fn render_page(state: ScoreView) -> Html<String> {
    let json = serde_json::json!({
        "clicks": state.clicks,
        "level": state.level,
    })
    .to_string()
    // keep the payload inside its <script> element
    .replace('<', "\\u003c");
    Html(INDEX_HTML.replace(STATE_PLACEHOLDER, &json))
}
