use clap::{Parser, Subcommand};
use imgrelay::{Result, codec, config, convert, fetch, render, report, rewrite, server};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imgrelay")]
#[command(about = "Local image relay: re-encode a page's images and compare sizes", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: config::GlobalArgs,

    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server (the default when no command is given).
    Serve,

    /// Build an image report for one page and write it to a file.
    Report {
        #[arg(long)]
        page: String,

        /// Fetch the page through the prerender service.
        #[arg(long)]
        prerender: bool,

        /// Write the size summary as JSON instead of HTML.
        #[arg(long)]
        json: bool,

        #[arg(short = 'o', long)]
        out: PathBuf,
    },

    /// Convert one image URL into <OUT_EXT> under the output directory.
    Convert {
        in_url: String,

        out_ext: String,

        #[arg(long, default_value = "result")]
        out_dir: PathBuf,
    },

    /// Print the browser observer script.
    Script,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = config::Settings::from(cli.global);

    match cli.cmd.unwrap_or(Commands::Serve) {
        Commands::Serve => server::serve(settings).await?,

        Commands::Report {
            page,
            prerender,
            json,
            out,
        } => {
            let fetcher = fetch::Fetcher::new();
            let data = report::generate_page_report(&fetcher, &settings, &page, prerender).await?;

            let body = if json {
                serde_json::to_string_pretty(&report::ReportView::from(&data))?
            } else {
                render::render_report_document(&data, &settings.public_base)
            };
            std::fs::write(&out, body)?;
            println!("Wrote {}", out.display());
        }

        Commands::Convert {
            in_url,
            out_ext,
            out_dir,
        } => {
            let format = codec::ImageFormat::from_extension(&out_ext)
                .ok_or_else(|| anyhow::anyhow!("don't know how to encode {}", out_ext))?;
            let fetcher = fetch::Fetcher::new();
            let encoded = convert::convert_url(&fetcher, &settings, &in_url, format).await?;

            let out_path = convert::output_path(&out_dir, &in_url, &out_ext);
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&out_path, &encoded)?;
            info!(
                "Created file {} of size {}",
                out_path.display(),
                report::format_bytes(encoded.len())
            );
        }

        Commands::Script => {
            print!(
                "{}",
                rewrite::observer_script(&settings.src_prefix, settings.prefix_policy)?
            );
        }
    }

    Ok(())
}
