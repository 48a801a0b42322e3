use colored::*;
use futures::StreamExt;
use promptimg::{logger, ClientConfig, ImageGenerator, ImageRef, Outcome, ViewStatus};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::WatchStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(logger::LoggerConfig::from_env())?;

    if env_loaded {
        log::info!(".env file loaded");
    } else {
        log::debug!("No .env file found, using process environment");
    }

    let config = ClientConfig::from_env();
    logger::log_config_info(&config);

    let generator = Arc::new(ImageGenerator::from_config(&config)?);

    // Status line, driven purely by state changes.
    let mut updates = WatchStream::new(generator.subscribe());
    let renderer = tokio::spawn(async move {
        let mut last = None;
        while let Some(state) = updates.next().await {
            let status = state.status();
            if last.as_ref() == Some(&status) {
                continue;
            }
            if status == ViewStatus::Loading {
                eprintln!("{}", "Generating...".bright_blue());
            }
            last = Some(status);
        }
    });

    eprintln!("Describe the image you want to generate (:quit to exit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut generated = 0u32;

    while let Some(line) = lines.next_line().await? {
        if line.trim() == ":quit" {
            break;
        }

        generator.set_prompt(line);

        match generator.generate_image().await {
            Outcome::Skipped => continue,
            Outcome::Busy => eprintln!("{}", "A generation is already running".yellow()),
            Outcome::Generated(Some(image)) => {
                generated += 1;
                show_image(&image, config.save_dir.as_deref(), generated);
            }
            Outcome::Generated(None) => {
                eprintln!("{}", "The service returned no image".yellow())
            }
            Outcome::Failed(message) => eprintln!("{} {}", "Error:".red().bold(), message),
        }
    }

    renderer.abort();
    log::debug!("Session ended after {} image(s)", generated);
    Ok(())
}

fn show_image(image: &ImageRef, save_dir: Option<&Path>, index: u32) {
    if let (true, Some(dir)) = (image.is_data_url(), save_dir) {
        match image.save_inline(dir, &format!("image-{}", index)) {
            Ok(Some(path)) => {
                println!("{}", path.display());
                return;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Could not save inline image: {}", e),
        }
    }
    println!("{}", image);
}
