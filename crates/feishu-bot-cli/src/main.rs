use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use feishu_core::{
    Card, CardElement, CardTitleBgColor, Language, Message, Post, PostElement, WebhookBot,
};
use feishu_telemetry::{TelemetryConfig, init_telemetry};
use time::OffsetDateTime;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(TelemetryConfig::from_env(
        "feishu-bot",
        env!("CARGO_PKG_VERSION"),
    ))?;

    match cli.command {
        CliCommand::Text { content } => deliver(&cli.global, Message::text(content)).await,
        CliCommand::Image { image_key } => deliver(&cli.global, Message::image(image_key)).await,
        CliCommand::Post { title, lang, lines } => {
            let post = lines
                .into_iter()
                .fold(Post::new(lang, title), |post, line| {
                    post.line([PostElement::text(line)])
                });
            deliver(&cli.global, Message::post(post, [])).await
        }
        CliCommand::Card {
            title,
            lang,
            color,
            markdown,
        } => {
            let card = Card::new(lang, title, markdown.into_iter().map(CardElement::markdown));
            deliver(&cli.global, Message::card(color, None, card, [])).await
        }
        CliCommand::Decrypt { key, encrypt } => {
            let plaintext = security::decrypt(&encrypt, &key).context("decrypt failed")?;
            println!("{plaintext}");
            Ok(())
        }
        CliCommand::Encrypt { key, plaintext } => {
            let encrypt = security::encrypt(&plaintext, &key).context("encrypt failed")?;
            println!("{}", serde_json::json!({ "encrypt": encrypt }));
            Ok(())
        }
        CliCommand::Sign { timestamp } => {
            let Some(secret) = cli.global.secret.as_deref().filter(|s| !s.is_empty()) else {
                bail!("--secret or FEISHU_SECRET is required to sign");
            };
            let timestamp =
                timestamp.unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());
            let sign = security::gen_sign(secret, timestamp)?;
            println!("timestamp={timestamp}");
            println!("sign={sign}");
            Ok(())
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "feishu-bot",
    version,
    about = "Send messages through a Feishu custom bot and inspect event callbacks"
)]
struct Cli {
    #[command(flatten)]
    global: WebhookArgs,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug)]
struct WebhookArgs {
    /// Webhook URL or bare hook id.
    #[arg(long, env = "FEISHU_WEBHOOK", global = true, hide_env_values = true)]
    webhook: Option<String>,
    /// Signing secret of the bot; messages are sent unsigned when empty.
    #[arg(long, env = "FEISHU_SECRET", global = true, hide_env_values = true)]
    secret: Option<String>,
    /// Print the payload instead of sending it.
    #[arg(long, env = "FEISHU_BOT_DRY_RUN", global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Send a plain text message
    Text { content: String },
    /// Send an uploaded image by key
    Image { image_key: String },
    /// Send a rich text post, one paragraph per line
    Post {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "zh_cn")]
        lang: Language,
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Send an interactive card made of markdown blocks
    Card {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "zh_cn")]
        lang: Language,
        #[arg(long, default_value = "blue")]
        color: CardTitleBgColor,
        #[arg(required = true)]
        markdown: Vec<String>,
    },
    /// Decrypt the `encrypt` field of an event callback
    Decrypt {
        #[arg(long)]
        key: String,
        encrypt: String,
    },
    /// Produce an encrypted callback envelope for local testing
    Encrypt {
        #[arg(long)]
        key: String,
        plaintext: String,
    },
    /// Compute the webhook signature for a timestamp using `--secret`
    Sign {
        /// Unix seconds; defaults to now.
        #[arg(long, allow_hyphen_values = true)]
        timestamp: Option<i64>,
    },
}

async fn deliver(args: &WebhookArgs, msg: Message) -> Result<()> {
    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&msg)?);
        return Ok(());
    }
    let Some(webhook) = args.webhook.as_deref().filter(|w| !w.trim().is_empty()) else {
        bail!("--webhook or FEISHU_WEBHOOK is required to send messages");
    };
    let bot = WebhookBot::new(webhook, args.secret.as_deref().unwrap_or_default());
    tracing::info!(
        msg_type = %msg.msg_type(),
        signed = bot.is_signed(),
        "sending message"
    );
    bot.send(msg)
        .await
        .with_context(|| format!("failed to send message to {}", bot.webhook()))?;
    println!("sent");
    Ok(())
}
