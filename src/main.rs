use financecontrol::app;
use financecontrol::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Positional <facturas> <users> override the environment
    let config = AppConfig::load()?;

    app::run(config).await?;

    Ok(())
}
