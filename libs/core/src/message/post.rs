use serde::Serialize;
use serde_json::{Map, Value, json};

use super::{Language, Message, MsgType};

/// One inline node of a rich text line.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum PostElement {
    Text {
        text: String,
        #[serde(skip_serializing_if = "is_false")]
        un_escape: bool,
    },
    #[serde(rename = "a")]
    Link { text: String, href: String },
    At {
        user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
    },
    #[serde(rename = "img")]
    Image { image_key: String },
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PostElement {
    pub fn text(text: impl Into<String>) -> Self {
        PostElement::Text {
            text: text.into(),
            un_escape: false,
        }
    }

    /// Text whose HTML entities are decoded by the client (`&nbsp;` etc).
    pub fn unescaped(text: impl Into<String>) -> Self {
        PostElement::Text {
            text: text.into(),
            un_escape: true,
        }
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        PostElement::Link {
            text: text.into(),
            href: href.into(),
        }
    }

    pub fn at(user_id: impl Into<String>) -> Self {
        PostElement::At {
            user_id: user_id.into(),
            user_name: None,
        }
    }

    pub fn at_all() -> Self {
        Self::at("all")
    }

    pub fn image(image_key: impl Into<String>) -> Self {
        PostElement::Image {
            image_key: image_key.into(),
        }
    }
}

/// Rich text body for a single language.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub lang: Language,
    pub title: String,
    pub content: Vec<Vec<PostElement>>,
}

impl Post {
    pub fn new(lang: Language, title: impl Into<String>) -> Self {
        Self {
            lang,
            title: title.into(),
            content: Vec::new(),
        }
    }

    pub fn line(mut self, elements: impl IntoIterator<Item = PostElement>) -> Self {
        self.content.push(elements.into_iter().collect());
        self
    }
}

impl Message {
    /// Builds a `post` message; each [`Post`] contributes one language.
    /// A later post for an already present language replaces the earlier one.
    pub fn post(post: Post, more: impl IntoIterator<Item = Post>) -> Self {
        let mut langs = Map::new();
        for p in std::iter::once(post).chain(more) {
            langs.insert(
                p.lang.as_str().to_string(),
                json!({ "title": p.title, "content": p.content }),
            );
        }
        Self::from_json(json!({
            "msg_type": MsgType::Post.as_str(),
            "content": { "post": Value::Object(langs) },
        }))
    }
}
