use std::path::{Path, PathBuf};

use board_client::{BoardClientHttp, ClientConfig, RealtimeSubscription, init_logging};
use board_core::data::storage::content_type_for;
use board_core::{BoardError, BoardService, ImageFile, Post, PostBoard, PostDraft, PostId};
use clap::Parser;
use tracing::error;

#[derive(Parser, Debug)]
#[clap(about = "Create, list and delete posts")]
struct Cli {
    /// Project URL, overrides SUPABASE_URL
    #[clap(short, long)]
    url: Option<String>,

    /// Anonymous API key, overrides SUPABASE_ANON_KEY
    #[clap(short, long)]
    key: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Print every post
    List,
    Create {
        #[clap(long)]
        title: String,
        #[clap(long)]
        description: Option<String>,
        /// Image file to attach
        #[clap(long)]
        image: Option<PathBuf>,
    },
    Delete {
        id: PostId,
    },
    /// Follow live changes until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Cli::parse();

    let config = match (args.url, args.key) {
        (None, None) => ClientConfig::from_env()?,
        (url, key) => ClientConfig::load(url, key)?,
    };
    let service = BoardService::new(BoardClientHttp::connect(&config)?);

    match args.command {
        Command::List => {
            let posts = service.load_posts().await?;
            println!("Posts ({})", posts.len());
            for post in &posts {
                print_post(post);
            }
        }
        Command::Create {
            title,
            description,
            image,
        } => {
            let mut draft = PostDraft::new(title);
            draft.description = description;
            if let Some(path) = image {
                draft = draft.with_image(read_image(&path)?);
            }

            match service.create_post(draft).await {
                Ok(post) => println!("Post created! ID: {}", post.id),
                Err(BoardError::MissingTitle) => {
                    eprintln!("Title is required!");
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Delete { id } => {
            service.delete_post(id).await?;
            println!("Post deleted!");
        }
        Command::Watch => watch(&service, &config).await?,
    }

    Ok(())
}

async fn watch(service: &BoardService<BoardClientHttp>, config: &ClientConfig) -> anyhow::Result<()> {
    let mut board = PostBoard::new();
    board.replace_all(service.load_posts().await?);
    println!("Watching {} posts, Ctrl-C to stop", board.len());

    let mut subscription = RealtimeSubscription::connect(config).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = subscription.next_event() => match event {
                Ok(Some(change)) => {
                    println!("{change}");
                    board.apply(change);
                    println!("Posts ({})", board.len());
                }
                Ok(None) => {
                    error!("realtime connection closed by server");
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, "realtime subscription failed");
                    return Err(e.into());
                }
            },
        }
    }

    subscription.leave().await?;
    Ok(())
}

fn read_image(path: &Path) -> anyhow::Result<ImageFile> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid image path: {}", path.display()))?
        .to_string();
    let bytes = std::fs::read(path)?;

    Ok(ImageFile {
        content_type: content_type_for(&file_name).to_string(),
        file_name,
        bytes,
    })
}

fn print_post(post: &Post) {
    println!("- [{}] {} ({})", post.id, post.title, post.created_at.to_rfc3339());
    if let Some(description) = post.description.as_deref().filter(|d| !d.is_empty()) {
        println!("    {description}");
    }
    if let Some(url) = &post.image_url {
        println!("    image: {url}");
    }
}
