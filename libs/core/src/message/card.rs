use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::{Language, Message, MsgType};

/// Header colour of an interactive card (`header.template`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTitleBgColor {
    Blue,
    Wathet,
    Turquoise,
    Green,
    Yellow,
    Orange,
    Red,
    Carmine,
    Violet,
    Purple,
    Indigo,
    Grey,
}

impl CardTitleBgColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardTitleBgColor::Blue => "blue",
            CardTitleBgColor::Wathet => "wathet",
            CardTitleBgColor::Turquoise => "turquoise",
            CardTitleBgColor::Green => "green",
            CardTitleBgColor::Yellow => "yellow",
            CardTitleBgColor::Orange => "orange",
            CardTitleBgColor::Red => "red",
            CardTitleBgColor::Carmine => "carmine",
            CardTitleBgColor::Violet => "violet",
            CardTitleBgColor::Purple => "purple",
            CardTitleBgColor::Indigo => "indigo",
            CardTitleBgColor::Grey => "grey",
        }
    }
}

impl FromStr for CardTitleBgColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let color = match s.trim().to_ascii_lowercase().as_str() {
            "blue" => CardTitleBgColor::Blue,
            "wathet" => CardTitleBgColor::Wathet,
            "turquoise" => CardTitleBgColor::Turquoise,
            "green" => CardTitleBgColor::Green,
            "yellow" => CardTitleBgColor::Yellow,
            "orange" => CardTitleBgColor::Orange,
            "red" => CardTitleBgColor::Red,
            "carmine" => CardTitleBgColor::Carmine,
            "violet" => CardTitleBgColor::Violet,
            "purple" => CardTitleBgColor::Purple,
            "indigo" => CardTitleBgColor::Indigo,
            "grey" | "gray" => CardTitleBgColor::Grey,
            other => return Err(format!("unknown card color: {other}")),
        };
        Ok(color)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CardConfig {
    pub wide_screen_mode: bool,
    pub enable_forward: bool,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            wide_screen_mode: true,
            enable_forward: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTag {
    PlainText,
    LarkMd,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardText {
    pub tag: TextTag,
    pub content: String,
}

impl CardText {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            tag: TextTag::PlainText,
            content: content.into(),
        }
    }

    pub fn lark_md(content: impl Into<String>) -> Self {
        Self {
            tag: TextTag::LarkMd,
            content: content.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonKind {
    #[default]
    Default,
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardButton {
    tag: &'static str,
    pub text: CardText,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ButtonKind,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum CardElement {
    Markdown { content: String },
    Hr,
    Div { text: CardText },
    Note { elements: Vec<CardText> },
    Img { img_key: String, alt: CardText },
    Action { actions: Vec<CardButton> },
}

impl CardElement {
    pub fn markdown(content: impl Into<String>) -> Self {
        CardElement::Markdown {
            content: content.into(),
        }
    }

    pub fn hr() -> Self {
        CardElement::Hr
    }

    pub fn div(text: impl Into<String>, lark_md: bool) -> Self {
        let text = if lark_md {
            CardText::lark_md(text)
        } else {
            CardText::plain(text)
        };
        CardElement::Div { text }
    }

    pub fn note(text: impl Into<String>) -> Self {
        CardElement::Note {
            elements: vec![CardText::plain(text)],
        }
    }

    pub fn image(image_key: impl Into<String>, alt: impl Into<String>) -> Self {
        CardElement::Img {
            img_key: image_key.into(),
            alt: CardText::plain(alt),
        }
    }

    /// A single link button wrapped in an `action` block.
    pub fn button(text: impl Into<String>, url: impl Into<String>, kind: ButtonKind) -> Self {
        CardElement::Action {
            actions: vec![CardButton {
                tag: "button",
                text: CardText::plain(text),
                url: url.into(),
                kind,
            }],
        }
    }
}

/// Card content for one language.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub lang: Language,
    pub title: String,
    pub elements: Vec<CardElement>,
}

impl Card {
    pub fn new(
        lang: Language,
        title: impl Into<String>,
        elements: impl IntoIterator<Item = CardElement>,
    ) -> Self {
        Self {
            lang,
            title: title.into(),
            elements: elements.into_iter().collect(),
        }
    }
}

impl Message {
    /// Builds an `interactive` card. Each [`Card`] supplies the title and
    /// elements for its language; the first card's title is also the
    /// fallback `content` shown by clients without a matching locale.
    pub fn card(
        bg_color: CardTitleBgColor,
        config: Option<CardConfig>,
        card: Card,
        more: impl IntoIterator<Item = Card>,
    ) -> Self {
        let fallback_title = card.title.clone();
        let mut titles = Map::new();
        let mut elements = Map::new();
        for c in std::iter::once(card).chain(more) {
            let lang = c.lang.as_str().to_string();
            titles.insert(lang.clone(), Value::String(c.title));
            elements.insert(lang, json!(c.elements));
        }

        Self::from_json(json!({
            "msg_type": MsgType::Interactive.as_str(),
            "card": {
                "config": config.unwrap_or_default(),
                "header": {
                    "template": bg_color.as_str(),
                    "title": {
                        "tag": "plain_text",
                        "content": fallback_title,
                        "i18n": Value::Object(titles),
                    },
                },
                "i18n_elements": Value::Object(elements),
            },
        }))
    }
}
