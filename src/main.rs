use clap::{command, Parser, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use docchat::config::SUGGESTED_MODELS;
use docchat::model::DocumentKind;
use docchat::report::generate_report_now;
use docchat::{
    create_backend, report_file_name, AssistantConfig, BackendKind, ChatRole, ChatSession,
    DocumentLoader, RelayUpdate,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Image,
    Pdf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Ollama,
    Openai,
    Openrouter,
}

#[derive(Parser, Debug)]
#[command(name = "docchat", version, about = "Chat with an LLM about an image or PDF")]
struct Cli {
    /// Image (jpg, png) or PDF to load before chatting
    #[arg(value_name = "FILE", index = 1)]
    input: Option<PathBuf>,

    /// Force the upload type instead of detecting it
    #[arg(short, long, value_enum)]
    kind: Option<KindArg>,

    /// Model name, e.g. llama3, llama3:8b, llama3:70b, gpt-4
    #[arg(short, long)]
    model: Option<String>,

    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ask one question, print the answer and exit
    #[arg(short, long)]
    ask: Option<String>,

    /// Plain chat with history and no document grounding
    #[arg(long)]
    plain: bool,

    /// Write the session report here on exit
    #[arg(short, long)]
    report: Option<PathBuf>,
}

const HELP: &str = "Commands:
  /load <path>     load an image or PDF
  /text            show the full extracted text
  /preview         show the document preview
  /sentiment       show the document sentiment
  /history         show the conversation
  /model <name>    switch model
  /report [path]   write the session report
  /reset           forget the document and the conversation
  /help            show this help
  /quit            exit
Anything else is sent as a question.";

fn print_delta(update: RelayUpdate<'_>) {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(update.delta.as_bytes());
    let _ = stdout.flush();
}

async fn load_into(
    loader: &DocumentLoader,
    session: &mut ChatSession,
    path: &PathBuf,
    kind: Option<DocumentKind>,
) {
    eprintln!("Processing {}...", path.display());
    match loader.load_path(path, kind).await {
        Ok(document) => {
            let kind = document.kind;
            let sentiment = session.load_document(document);
            eprintln!("✅ Successfully processed {}", kind);
            if let Some(preview) = session.preview() {
                println!("📜 Document Preview\n{}\n", preview);
            }
            println!("{} Sentiment: {}", sentiment.emoji(), sentiment.title());
        }
        Err(e) => {
            session.clear_document();
            eprintln!("⚠️ {}", e);
        }
    }
}

fn write_report(session: &ChatSession, path: Option<PathBuf>) {
    let path = path.unwrap_or_else(|| PathBuf::from(report_file_name(&chrono::Local::now())));
    match fs::write(&path, generate_report_now(session)) {
        Ok(()) => eprintln!("Report written to: {}", path.display()),
        Err(e) => eprintln!("Failed to write '{}': {}", path.display(), e),
    }
}

async fn answer(session: &mut ChatSession, plain: bool, question: &str) {
    let result = if plain {
        session.chat(question, print_delta).await
    } else {
        session.ask(question, print_delta).await
    };
    match result {
        Ok(_) => println!(" 🤖"),
        Err(e) => {
            println!();
            eprintln!("❌ {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with streamed answers
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,docchat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AssistantConfig::from_toml_file(path)?,
        None => AssistantConfig::from_env(),
    };
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(backend) = cli.backend {
        config.backend = match backend {
            BackendArg::Auto => BackendKind::Auto,
            BackendArg::Ollama => BackendKind::Ollama,
            BackendArg::Openai => BackendKind::OpenAi,
            BackendArg::Openrouter => BackendKind::OpenRouter,
        };
    }
    config.validate()?;

    let kind = cli.kind.map(|k| match k {
        KindArg::Image => DocumentKind::Image,
        KindArg::Pdf => DocumentKind::Pdf,
    });

    let backend = create_backend(&config)?;
    let loader = DocumentLoader::from_config(&config);
    let mut session = ChatSession::new(backend, config);

    if let Some(path) = &cli.input {
        if !path.exists() {
            return Err(format!("Error: File '{}' not found", path.display()).into());
        }
        load_into(&loader, &mut session, path, kind).await;
    }

    if let Some(question) = &cli.ask {
        answer(&mut session, cli.plain, question).await;
        if cli.report.is_some() {
            write_report(&session, cli.report.clone());
        }
        return Ok(());
    }

    eprintln!(
        "Model: {} (suggested: {}). Type /help for commands.",
        session.config().model,
        SUGGESTED_MODELS.join(", ")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("💬 ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/load" if !arg.is_empty() => {
                load_into(&loader, &mut session, &PathBuf::from(arg), kind).await
            }
            "/load" => eprintln!("Usage: /load <path>"),
            "/text" => match session.context_text() {
                Some(text) => println!("📄 Full Extracted Text\n{}", text),
                None => eprintln!("No document loaded"),
            },
            "/preview" => match session.preview() {
                Some(preview) => println!("{}", preview),
                None => eprintln!("No document loaded"),
            },
            "/sentiment" => {
                let s = session.sentiment();
                println!("{} Sentiment: {}", s.emoji(), s.title());
            }
            "/history" => {
                for turn in session.messages() {
                    let who = match turn.role {
                        ChatRole::User => "you",
                        ChatRole::Assistant => "assistant",
                        ChatRole::System => "system",
                    };
                    println!("[{}] {}", who, turn.content);
                }
            }
            "/model" if !arg.is_empty() => {
                session.set_model(arg);
                eprintln!("Model set to {}", arg);
            }
            "/model" => eprintln!("Model: {}", session.config().model),
            "/report" => write_report(
                &session,
                if arg.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(arg))
                },
            ),
            "/reset" => {
                session.reset();
                eprintln!("Session cleared");
            }
            _ if command.starts_with('/') => eprintln!("Unknown command {}. Try /help", command),
            _ => answer(&mut session, cli.plain, line).await,
        }
    }

    if cli.report.is_some() {
        write_report(&session, cli.report);
    }
    Ok(())
}
