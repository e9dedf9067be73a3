use clap::{Parser, Subcommand};
use exif_query::{config, metadata, output, selector, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exif-query")]
#[command(about = "Image proxy and EXIF metadata query service")]
#[command(long_about = "\
Image proxy and EXIF metadata query service

Serves images from a remote bucket and answers field queries against their
EXIF metadata, over a JSON API and a small HTML front end.

Query expressions:

  $..Image.Make        Make in the Image namespace
  Photo.ISO            aliases are accepted (ISO → PhotographicSensitivity)
  $..Make              Make in every namespace
  $..GPSInfo           the whole GPSInfo namespace

Namespaces: Image, Photo, GPSInfo, Iop, Thumbnail

Run 'exif-query gen-config' to generate a documented exif-query.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "exif-query.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Print a stock exif-query.toml with all options documented
    GenConfig,
    /// Decode a local image and print its metadata
    Inspect(InspectArgs),
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Port to listen on (overrides server.port)
    #[arg(long, env = "EXIF_QUERY_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides server.bind)
    #[arg(long, env = "EXIF_QUERY_BIND")]
    bind: Option<String>,

    /// Remote bucket base URL (overrides store.base_url)
    #[arg(long, env = "EXIF_QUERY_BASE_URL")]
    base_url: Option<String>,
}

#[derive(clap::Args)]
struct InspectArgs {
    /// Image file to decode
    file: PathBuf,

    /// Query expression; repeat to select several fields
    #[arg(long = "select", short = 's')]
    select: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            init_tracing();
            let mut service_config = config::load_config(&cli.config)?;
            if let Some(port) = args.port {
                service_config.server.port = port;
            }
            if let Some(bind) = args.bind {
                service_config.server.bind = bind;
            }
            if let Some(base_url) = args.base_url {
                service_config.store.base_url = base_url;
            }
            service_config.validate()?;
            server::serve(service_config).await?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Inspect(args) => {
            let selectors = selector::parse_all(&args.select)?;
            let bytes = std::fs::read(&args.file)?;
            let decoded = metadata::decode(&bytes)?;
            if selectors.is_empty() {
                output::print_metadata(&decoded);
            } else {
                let extracted = selector::extract(&decoded, &selectors);
                output::print_extracted(&extracted, selectors.len());
            }
        }
    }

    Ok(())
}
