use promptimg::{ClientConfig, ImageGenerator, Outcome};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();
    promptimg::logger::init()?;

    if env_loaded {
        log::info!(".env file loaded");
    } else {
        log::warn!("No .env file found");
    }

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "A watercolor fox sleeping under a maple tree".to_string());

    let generator = ImageGenerator::from_config(&ClientConfig::from_env())?;
    generator.set_prompt(prompt);

    match generator.generate_image().await {
        Outcome::Generated(image) => println!("{:?}", image),
        other => println!("{:?}", other),
    }
    println!("{:#?}", generator.snapshot());

    Ok(())
}
