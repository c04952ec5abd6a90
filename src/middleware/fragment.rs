use axum::{
    extract::Request,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};

use super::identity::is_hx_request;
use crate::error::ErrorMessage;

/// Re-renders error responses as an HTML fragment for `hx-request` callers.
///
/// Only responses carrying an [`ErrorMessage`] are touched; everything else
/// passes through unchanged.
pub async fn fragment_errors_middleware(request: Request, next: Next) -> Response {
    let wants_fragment = is_hx_request(request.headers());
    let response = next.run(request).await;

    if !wants_fragment {
        return response;
    }
    let Some(ErrorMessage(message)) = response.extensions().get::<ErrorMessage>().cloned() else {
        return response;
    };

    let status = response.status();
    let mut fragment = (status, Html(error_fragment(&message))).into_response();
    for (name, value) in response.headers() {
        if !fragment.headers().contains_key(name) {
            fragment.headers_mut().insert(name.clone(), value.clone());
        }
    }
    fragment
}

pub fn error_fragment(message: &str) -> String {
    format!(
        r#"<div class="error" role="alert">{}</div>"#,
        escape_html(message)
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_escapes_message() {
        assert_eq!(
            error_fragment("<b>\"x\" & 'y'</b>"),
            r#"<div class="error" role="alert">&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;</div>"#
        );
    }
}
