//! HTML pages: home, about and not-found.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::fmt::Write;

use crate::date::format_date_now;
use crate::http::server::AppState;
use crate::store::{MessageSnapshot, PendingKind};

/// Title used when a page has none.
pub const DEFAULT_TITLE: &str = "Stacks Guestbook";

/// Page routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    About,
    NotFound,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home - Stacks Guestbook",
            Page::About => "About - Stacks Guestbook",
            Page::NotFound => "Page Not Found - Stacks Guestbook",
        }
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn layout(title: Option<&str>, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<nav><a href=\"/\">Home</a> | <a href=\"/about\">About</a></nav>\n<main>\n{}</main>\n</body>\n</html>\n",
        escape_html(title.unwrap_or(DEFAULT_TITLE)),
        body
    )
}

fn render_page(page: Page, body: &str) -> Html<String> {
    Html(layout(Some(page.title()), body))
}

/// Render the message list section of the home page.
pub fn render_messages(state: &AppState, snapshot: &MessageSnapshot) -> String {
    let network = state.network();
    let mut body = String::new();

    if let Some(error) = &snapshot.error {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(error));
    }

    if !snapshot.pending_transactions.is_empty() {
        body.push_str("<section class=\"pending\">\n<h2>Pending transactions</h2>\n<ul>\n");
        for tx in &snapshot.pending_transactions {
            let what = match &tx.kind {
                PendingKind::Post { .. } => "Posting message".to_string(),
                PendingKind::Like { message_id } => format!("Liking message #{}", message_id),
                PendingKind::Tip { message_id, amount, .. } => {
                    format!("Tipping {} µSTX on message #{}", amount, message_id)
                }
            };
            let txid = tx.id.to_string();
            let _ = writeln!(
                body,
                "<li>{} (<a href=\"{}\">{}</a>)</li>",
                what,
                escape_html(&network.tx_explorer_link(&txid)),
                escape_html(&txid)
            );
        }
        body.push_str("</ul>\n</section>\n");
    }

    if snapshot.messages.is_empty() {
        body.push_str("<p>No messages yet. Be the first to sign the guestbook!</p>\n");
        return body;
    }

    body.push_str("<ul class=\"messages\">\n");
    for message in &snapshot.messages {
        let liked = snapshot.user_likes.get(&message.id).copied().unwrap_or(false);
        let _ = writeln!(
            body,
            "<li id=\"message-{id}\"><p>{content}</p><p><a href=\"{author_url}\">{author}</a> · {when} · {likes} like{plural}{liked}</p></li>",
            id = message.id,
            content = escape_html(&message.content),
            author_url = escape_html(&network.address_explorer_link(&message.author)),
            author = escape_html(&message.author),
            when = format_date_now(message.timestamp, true),
            likes = message.likes,
            plural = if message.likes == 1 { "" } else { "s" },
            liked = if liked { " · liked" } else { "" },
        );
    }
    body.push_str("</ul>\n");
    body
}

pub async fn home(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.store.snapshot().await;
    let mut body = format!("<h1>{}</h1>\n", escape_html(&state.config.app.name));

    match state.store.auth().user_address() {
        Some(address) => {
            let _ = writeln!(body, "<p>Signed in as {}</p>", escape_html(&address));
        }
        None => body.push_str("<p>Connect your wallet to post and like messages.</p>\n"),
    }

    body.push_str(&render_messages(&state, &snapshot));
    render_page(Page::Home, &body)
}

pub async fn about(State(state): State<AppState>) -> Html<String> {
    let app = &state.config.app;
    let network = state.network();
    let body = format!(
        "<h1>About {}</h1>\n<p>{}</p>\n<p>Messages are stored on the Stacks blockchain ({}) in the <code>{}.{}</code> contract. Messages are limited to {} characters.</p>\n",
        escape_html(&app.name),
        escape_html(&app.description),
        app.network,
        escape_html(&network.contract_address),
        escape_html(&network.contract_name),
        app.message_max_length,
    );
    render_page(Page::About, &body)
}

pub async fn not_found() -> impl IntoResponse {
    let body = "<h1>Page Not Found</h1>\n<p>The page you are looking for does not exist.</p>\n<p><a href=\"/\">Back to the guestbook</a></p>\n";
    (StatusCode::NOT_FOUND, render_page(Page::NotFound, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        assert_eq!(Page::Home.title(), "Home - Stacks Guestbook");
        assert_eq!(Page::About.title(), "About - Stacks Guestbook");
        assert_eq!(Page::NotFound.title(), "Page Not Found - Stacks Guestbook");
    }

    #[test]
    fn test_default_title() {
        assert!(layout(None, "").contains("<title>Stacks Guestbook</title>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
        assert_eq!(escape_html("你好 🚀"), "你好 🚀");
    }
}
