//! Inline markup understood by text, post and card messages.
//!
//! Mentions differ between message kinds: `text`/`post` use `user_id`, while
//! interactive cards use `id`.

pub fn at_all_in_post() -> String {
    r#"<at user_id="all"></at>"#.to_string()
}

pub fn at_user_in_post(id: &str) -> String {
    format!(r#"<at user_id="{id}"></at>"#)
}

/// Mention everyone inside a `msg_type = interactive` card.
pub fn at_all_in_card() -> String {
    "<at id=all></at>".to_string()
}

pub fn at_user_in_card(id: &str) -> String {
    format!(r#"<at id="{id}"></at>"#)
}

pub fn at_user_by_email(email: &str) -> String {
    format!(r#"<at user_email="{email}"></at>"#)
}

pub fn at_user_name(id: &str, name: Option<&str>) -> String {
    format!(r#"<at user_id="{id}">{}</at>"#, name.unwrap_or_default())
}

pub fn italics(s: &str) -> String {
    format!("*{s}*")
}

pub fn bold(s: &str) -> String {
    format!("**{s}**")
}

pub fn strikethrough(s: &str) -> String {
    format!("~~{s}~~")
}

pub fn link(url: &str) -> String {
    format!("<a>{url}</a>")
}

pub fn text_link(text: &str, url: &str) -> String {
    format!("[{text}]({url})")
}

pub fn image(hover_text: &str, image_key: &str) -> String {
    format!("!{}", text_link(hover_text, image_key))
}

pub fn horizontal_rule() -> String {
    " ---".to_string()
}
